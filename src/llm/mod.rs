//! LLM message model, backend trait and the conversation-owning client.
//!
//! # Overview
//!
//! The [`ChatBackend`] trait is the single call the rest of the crate needs
//! from a provider: send a history plus a tool catalogue, get one assistant
//! message back. [`ChatCompletionsDriver`] implements it for `OpenAI`-compatible
//! `/v1/chat/completions` endpoints. [`LlmClient`] owns the conversation
//! history and drives a backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcp_chat_client::llm::{ChatCompletionsDriver, LlmClient, LlmSettings};
//!
//! let settings = LlmSettings::openrouter(Some("sk-or-...".into()), "anthropic/claude-3-5-sonnet-20241022");
//! let model = settings.model.clone();
//! let driver = Arc::new(ChatCompletionsDriver::new(settings)?);
//! let mut llm = LlmClient::new(driver, model, "You are helpful.");
//! llm.append_user_message("Hello");
//! let reply = llm.complete(&[]).await?;
//! ```

pub mod chat_completions;
pub mod client;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use client::{DEFAULT_SYSTEM_PROMPT, LlmClient};
pub use provider::Provider;

use crate::error::Result;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://openrouter.ai/api`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `anthropic/claude-3-5-sonnet-20241022`).
    pub model: String,
    /// Provider type (auto-detected from `base_url`).
    pub provider: Provider,
    /// Upper bound on generated tokens per completion.
    pub max_tokens: Option<u32>,
    /// Forwarded to providers that accept it. Execution stays sequential either way.
    pub parallel_tool_calls: Option<bool>,
    /// Whole-request timeout for the HTTP client.
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("max_tokens", &self.max_tokens)
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    /// Settings for `OpenRouter` with the crate defaults.
    #[must_use]
    pub fn openrouter(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.into(),
            provider: Provider::OpenRouter,
            max_tokens: Some(1000),
            parallel_tool_calls: None,
            request_timeout_secs: 120,
        }
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content. `None` only for assistant messages that carry tool calls.
    pub content: Option<String>,
    /// Tool call ID (for tool responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls made by the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    /// Text content, empty when absent.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

impl From<AssistantMessage> for Message {
    fn from(msg: AssistantMessage) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: msg.content,
            tool_call_id: None,
            tool_calls: (!msg.tool_calls.is_empty()).then_some(msg.tool_calls),
        }
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
    /// Tool response.
    Tool,
}

impl MessageRole {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool call made by the assistant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call.
    pub id: String,
    /// Type of tool (always "function" for now).
    #[serde(rename = "type")]
    pub call_type: String,
    /// Function details.
    pub function: ToolCallFunction,
}

impl ToolCall {
    #[must_use]
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function details in a tool call.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallFunction {
    /// Function name.
    pub name: String,
    /// Arguments as JSON string.
    pub arguments: String,
}

/// The assistant's reply to one completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantMessage {
    pub content: Option<String>,
    /// Requested tool calls, in the order the model emitted them.
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

impl AssistantMessage {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        }
    }

    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Request to an LLM backend.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model to use for this request.
    pub model: String,
    /// Conversation messages, system prompt first.
    pub messages: Vec<Message>,
    /// Available tools in `OpenAI` function schema format.
    pub tools: Vec<serde_json::Value>,
}

/// A chat-completion provider.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Get the next assistant message.
    ///
    /// # Errors
    ///
    /// [`crate::ClientError::LlmUnavailable`] on transport or HTTP failure,
    /// [`crate::ClientError::LlmProtocol`] on a malformed response.
    async fn complete(&self, req: LlmRequest) -> Result<AssistantMessage>;
}

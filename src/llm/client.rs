//! Conversation-owning LLM client.

use std::sync::Arc;

use serde_json::Value;

use super::{AssistantMessage, ChatBackend, LlmRequest, Message};
use crate::conversation::ConversationHistory;
use crate::error::Result;

/// System prompt used when the configuration does not provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an intelligent assistant with access to MCP (Model Context Protocol) tools, resources, and prompts.

Guidelines:
- Use available tools to fetch real-time data when needed
- Leverage resources for reference information and context
- Be concise but thorough in your responses
- When using tools, explain what you're doing and why
- If multiple tools are needed, use them efficiently in sequence
- Always provide helpful, accurate information based on the data you receive";

/// Talks to a [`ChatBackend`] on behalf of one conversation.
#[derive(Debug, Clone)]
pub struct LlmClient {
    backend: Arc<dyn ChatBackend>,
    model: String,
    history: ConversationHistory,
}

impl LlmClient {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            history: ConversationHistory::new(system_prompt),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch models. Takes effect from the next completion on.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        tracing::info!(
            name: "llm.model.changed",
            conversation_id = %self.history.id(),
            model = %self.model,
            "Model changed"
        );
    }

    #[must_use]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[must_use]
    pub fn conversation_len(&self) -> usize {
        self.history.message_count()
    }

    /// Ask the backend for the next assistant message over the current history.
    ///
    /// History is not modified; the caller decides what to append.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::ClientError::LlmUnavailable`] and
    /// [`crate::ClientError::LlmProtocol`] from the backend.
    pub async fn complete(&self, tools: &[Value]) -> Result<AssistantMessage> {
        let req = LlmRequest {
            model: self.model.clone(),
            messages: self.history.messages().to_vec(),
            tools: tools.to_vec(),
        };
        self.backend.complete(req).await
    }

    pub fn append_user_message(&mut self, content: impl Into<String>) {
        self.history.push_user(content);
    }

    pub fn append_assistant_message(&mut self, message: AssistantMessage) {
        self.history.push_assistant(message);
    }

    pub fn append_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.history.push_tool_result(tool_call_id, content);
    }

    /// Append messages in order, e.g. a rendered prompt or a finished round.
    pub fn append_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.history.extend(messages);
    }

    /// Forget the conversation, keeping the system prompt.
    pub fn reset_history(&mut self) {
        self.history.reset();
    }
}

//! `OpenAI` Chat Completions API driver.
//!
//! This module implements [`ChatBackend`] for the Chat Completions API
//! (`/v1/chat/completions`). Requests are non-streaming: one POST, one
//! assistant message back.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::provider::AuthScheme;
use super::{AssistantMessage, ChatBackend, LlmRequest, LlmSettings, ToolCall};
use crate::error::{ClientError, Result};

/// Driver for the `OpenAI` Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, settings })
    }

    fn request_body(&self, req: &LlmRequest) -> Value {
        let mut body = serde_json::json!({
            "model": req.model,
            "stream": false,
            "messages": req.messages,
        });

        if let Some(max_tokens) = self.settings.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        if !req.tools.is_empty() {
            body["tools"] = Value::Array(req.tools.clone());
            if let Some(parallel) = self.settings.parallel_tool_calls
                && self.settings.provider.accepts_parallel_tool_calls()
            {
                body["parallel_tool_calls"] = parallel.into();
            }
        }
        body
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatCompletionsDriver {
    async fn complete(&self, req: LlmRequest) -> Result<AssistantMessage> {
        let url = self
            .settings
            .provider
            .build_chat_url(&self.settings.base_url, &req.model);
        let body = self.request_body(&req);

        tracing::debug!(
            name: "llm.request.sending",
            model = %req.model,
            messages = req.messages.len(),
            tools = req.tools.len(),
            "Sending chat completion request"
        );

        let mut rb = self.http.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            rb = match self.settings.provider.auth_scheme() {
                AuthScheme::Bearer => rb.bearer_auth(key),
                AuthScheme::ApiKeyHeader => rb.header("api-key", key),
            };
        }

        let resp = rb
            .send()
            .await
            .map_err(|e| ClientError::LlmUnavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ClientError::LlmUnavailable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let detail = error_detail(&text).unwrap_or_else(|| snippet(&text));
            tracing::warn!(
                name: "llm.request.failed",
                status = status.as_u16(),
                detail = %detail,
                "Chat completion request rejected"
            );
            return Err(ClientError::LlmUnavailable(format!("HTTP {status}: {detail}")));
        }

        let message = parse_completion(&text)?;
        tracing::debug!(
            name: "llm.response.received",
            tool_calls = message.tool_calls.len(),
            finish_reason = message.finish_reason.as_deref().unwrap_or(""),
            "Chat completion received"
        );
        Ok(message)
    }
}

#[derive(Deserialize)]
struct CompletionWire {
    #[serde(default)]
    choices: Vec<ChoiceWire>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct ChoiceWire {
    message: MessageWire,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageWire {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallWire>>,
}

#[derive(Deserialize)]
struct ToolCallWire {
    #[serde(default)]
    id: Option<String>,
    function: FunctionWire,
}

#[derive(Deserialize)]
struct FunctionWire {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Decode a successful response body into the first choice's message.
pub(crate) fn parse_completion(body: &str) -> Result<AssistantMessage> {
    let wire: CompletionWire = serde_json::from_str(body)
        .map_err(|e| ClientError::LlmProtocol(format!("invalid response body: {e}")))?;

    // Some providers report failures inside a 200 response.
    if let Some(error) = wire.error {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), ToString::to_string);
        return Err(ClientError::LlmProtocol(message));
    }

    let choice = wire
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::LlmProtocol("response has no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let arguments = match tc.function.arguments {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            let id = tc
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
            ToolCall::function(id, tc.function.name, arguments)
        })
        .collect();

    Ok(AssistantMessage {
        content: choice.message.content,
        tool_calls,
        finish_reason: choice.finish_reason,
    })
}

fn error_detail(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

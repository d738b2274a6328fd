//! Typed snapshots of MCP server objects.
//!
//! These mirror the MCP wire format (camelCase keys) so results from the SDK
//! can be decoded through `serde_json` without depending on the SDK's own
//! struct layout.

use serde::{Deserialize, Serialize};

/// JSON object used for tool and prompt arguments.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A tool exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// A readable resource exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// One entry of a `resources/read` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Base64 payload for binary resources.
    #[serde(default)]
    pub blob: Option<String>,
}

/// A prompt template exposed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgumentSpec>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgumentSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Role of a rendered prompt message. MCP only knows these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: ContentBlock,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    #[serde(default)]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// A single content part of a tool result or prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: ResourceContent,
    },
    ResourceLink {
        uri: String,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    /// Render this part as plain text for the model or a transcript.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Image { data, mime_type } => {
                format!("[image: {mime_type}, {} bytes base64]", data.len())
            }
            Self::Audio { data, mime_type } => {
                format!("[audio: {mime_type}, {} bytes base64]", data.len())
            }
            Self::Resource { resource } => match (&resource.text, &resource.blob) {
                (Some(text), _) => text.clone(),
                (None, Some(blob)) => {
                    format!("[resource {}: {} bytes base64]", resource.uri, blob.len())
                }
                (None, None) => format!("[resource {}]", resource.uri),
            },
            Self::ResourceLink { uri, name } => match name {
                Some(name) => format!("[resource link {name}: {uri}]"),
                None => format!("[resource link {uri}]"),
            },
            Self::Unknown => "[unsupported content]".to_string(),
        }
    }
}

/// Wire shape of `tools/call` results.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CallToolWire {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    pub is_error: Option<bool>,
    #[serde(rename = "structuredContent", default)]
    pub structured_content: Option<serde_json::Value>,
}

/// Outcome of a tool invocation.
///
/// Every server answer is funnelled into one of three shapes before it
/// reaches the conversation, so nothing untyped leaks into history.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain content parts.
    Content(Vec<ContentBlock>),
    /// Structured JSON plus the (optional) human-readable parts.
    Structured {
        value: serde_json::Value,
        content: Vec<ContentBlock>,
    },
    /// The call failed; the message is shown to the model.
    Error(String),
}

impl ToolOutput {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Text placed in the tool-role message for the model.
    #[must_use]
    pub fn to_model_text(&self) -> String {
        match self {
            Self::Content(parts) => join_parts(parts),
            Self::Structured { value, .. } => value.to_string(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }
}

impl From<CallToolWire> for ToolOutput {
    fn from(wire: CallToolWire) -> Self {
        if wire.is_error.unwrap_or(false) {
            let message = join_parts(&wire.content);
            return Self::Error(if message.is_empty() {
                "tool reported an error".to_string()
            } else {
                message
            });
        }
        match wire.structured_content {
            Some(value) => Self::Structured {
                value,
                content: wire.content,
            },
            None => Self::Content(wire.content),
        }
    }
}

pub(crate) fn join_parts(parts: &[ContentBlock]) -> String {
    parts
        .iter()
        .map(ContentBlock::render)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_tool_descriptor_without_schema() {
        let tool: ToolDescriptor = serde_json::from_value(json!({ "name": "ping" })).unwrap();
        assert_eq!(tool.name, "ping");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_decode_call_result_variants() {
        let wire: CallToolWire = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "72F, sunny" }]
        }))
        .unwrap();
        assert_eq!(ToolOutput::from(wire).to_model_text(), "72F, sunny");

        let wire: CallToolWire = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "no such city" }],
            "isError": true
        }))
        .unwrap();
        assert_eq!(
            ToolOutput::from(wire),
            ToolOutput::Error("no such city".to_string())
        );

        let wire: CallToolWire = serde_json::from_value(json!({
            "content": [],
            "structuredContent": { "temp": 72 }
        }))
        .unwrap();
        assert_eq!(ToolOutput::from(wire).to_model_text(), r#"{"temp":72}"#);
    }

    #[test]
    fn test_unknown_content_type_is_tolerated() {
        let block: ContentBlock =
            serde_json::from_value(json!({ "type": "hologram", "x": 1 })).unwrap();
        assert_eq!(block, ContentBlock::Unknown);
    }
}

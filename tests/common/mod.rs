//! In-memory fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use mcp_chat_client::llm::{AssistantMessage, ChatBackend, LlmRequest, ToolCall};
use mcp_chat_client::mcp::McpSession;
use mcp_chat_client::mcp::types::{
    ContentBlock, JsonObject, PromptArgumentSpec, PromptDescriptor, PromptMessage, PromptRole,
    RenderedPrompt, ResourceContent, ResourceDescriptor, ToolDescriptor, ToolOutput,
};
use mcp_chat_client::{ClientError, Result};

/// Tool name whose call never finishes.
pub const HANGING_TOOL: &str = "hang";

#[derive(Debug, Default)]
pub struct FakeSession {
    pub tools: Vec<ToolDescriptor>,
    pub tool_outputs: HashMap<String, ToolOutput>,
    pub resources: Vec<ResourceDescriptor>,
    /// Text per URI. A listed URI without an entry fails to read.
    pub resource_texts: HashMap<String, String>,
    pub prompts: Vec<PromptDescriptor>,
    pub rendered: HashMap<String, RenderedPrompt>,

    pub calls: Mutex<Vec<(String, Option<JsonObject>)>>,
    pub reads: Mutex<Vec<String>>,
    pub get_prompt_calls: AtomicUsize,
    pub closed: AtomicBool,
}

impl FakeSession {
    pub fn call_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl McpSession for FakeSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Option<JsonObject>) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        if name == HANGING_TOOL {
            std::future::pending::<()>().await;
        }
        self.tool_outputs
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::ToolExecution {
                tool: name.to_string(),
                reason: "no scripted output".to_string(),
            })
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        Ok(self.resources.clone())
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>> {
        self.reads.lock().unwrap().push(uri.to_string());
        match self.resource_texts.get(uri) {
            Some(text) => Ok(vec![ResourceContent {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: Some(text.clone()),
                blob: None,
            }]),
            None => Err(ClientError::ResourceNotFound {
                uri: uri.to_string(),
                reason: "read failed".to_string(),
            }),
        }
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>> {
        Ok(self.prompts.clone())
    }

    async fn get_prompt(
        &self,
        name: &str,
        _arguments: BTreeMap<String, String>,
    ) -> Result<RenderedPrompt> {
        self.get_prompt_calls.fetch_add(1, Ordering::SeqCst);
        self.rendered
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::PromptNotFound {
                name: name.to_string(),
                reason: "unknown".to_string(),
            })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend replaying a script, then repeating `fallback` (or failing) once it runs out.
#[derive(Debug, Default)]
pub struct FakeBackend {
    script: Mutex<VecDeque<AssistantMessage>>,
    fallback: Option<AssistantMessage>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl FakeBackend {
    pub fn scripted(replies: Vec<AssistantMessage>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn always(reply: AssistantMessage) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> LlmRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn complete(&self, req: LlmRequest) -> Result<AssistantMessage> {
        self.requests.lock().unwrap().push(req);
        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return Ok(reply);
        }
        self.fallback
            .clone()
            .ok_or_else(|| ClientError::LlmUnavailable("script exhausted".to_string()))
    }
}

pub fn tool_calls(calls: Vec<ToolCall>) -> AssistantMessage {
    AssistantMessage {
        content: None,
        tool_calls: calls,
        finish_reason: Some("tool_calls".to_string()),
    }
}

pub fn text_output(text: &str) -> ToolOutput {
    ToolOutput::Content(vec![ContentBlock::text(text)])
}

pub fn weather_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get_alerts".into(),
            description: Some("Get weather alerts for a US state".into()),
            input_schema: json!({
                "type": "object",
                "properties": { "state": { "type": "string" } },
                "required": ["state"]
            }),
        },
        ToolDescriptor {
            name: "get_forecast".into(),
            description: Some("Get weather forecast for a location".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" }
                },
                "required": ["latitude", "longitude"]
            }),
        },
    ]
}

pub fn weather_session() -> FakeSession {
    FakeSession {
        tools: weather_tools(),
        tool_outputs: HashMap::from([
            ("get_forecast".to_string(), text_output("72F, sunny")),
            ("get_alerts".to_string(), text_output("No active alerts")),
        ]),
        ..FakeSession::default()
    }
}

pub fn resource(uri: &str, name: &str, description: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        uri: uri.into(),
        name: name.into(),
        description: Some(description.into()),
        mime_type: Some("text/plain".into()),
        size: None,
    }
}

pub fn summarize_prompt() -> PromptDescriptor {
    PromptDescriptor {
        name: "summarize".into(),
        description: Some("Summarize a topic".into()),
        arguments: vec![PromptArgumentSpec {
            name: "topic".into(),
            description: None,
            required: true,
        }],
    }
}

pub fn summarize_rendered() -> RenderedPrompt {
    RenderedPrompt {
        description: None,
        messages: vec![
            PromptMessage {
                role: PromptRole::User,
                content: ContentBlock::text("Please summarize the weather."),
            },
            PromptMessage {
                role: PromptRole::Assistant,
                content: ContentBlock::text("Sure, which region?"),
            },
        ],
    }
}

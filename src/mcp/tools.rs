//! Tool discovery and invocation.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::llm::ToolCall;
use crate::mcp::session::McpSession;
use crate::mcp::types::{JsonObject, ToolDescriptor, ToolOutput, join_parts};

/// Outcome of one model-requested tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
    pub output: ToolOutput,
}

#[derive(Debug, Clone)]
pub struct ToolManager {
    session: Arc<dyn McpSession>,
}

impl ToolManager {
    pub fn new(session: Arc<dyn McpSession>) -> Self {
        Self { session }
    }

    /// Fresh tool listing from the server.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.session.list_tools().await
    }

    /// Tools in `OpenAI` function-calling format, one entry per server tool.
    pub async fn list_formatted_tools(&self) -> Result<Vec<Value>> {
        Ok(format_tools(&self.list_tools().await?))
    }

    /// Run a model-issued tool call against the given tool snapshot.
    ///
    /// Never fails: argument problems, unknown tools and server errors all come
    /// back as [`ToolOutput::Error`] so the conversation can continue.
    pub async fn execute_tool(&self, call: &ToolCall, tools: &[ToolDescriptor]) -> ToolCallResult {
        let name = call.function.name.as_str();
        let raw = call.function.arguments.as_str();

        let (arguments, output) = match prepare_arguments(name, raw, tools) {
            Ok(args) => {
                let shown = Value::Object(args.clone());
                match self.session.call_tool(name, Some(args)).await {
                    Ok(output) => (shown, output),
                    Err(e) => (shown, ToolOutput::Error(e.to_string())),
                }
            }
            Err(e) => (Value::String(raw.to_string()), ToolOutput::Error(e.to_string())),
        };

        if output.is_error() {
            tracing::warn!(
                name: "mcp.tool.failed",
                call_id = %call.id,
                tool = %name,
                error = %output.to_model_text(),
                "Tool call failed"
            );
        } else {
            tracing::info!(
                name: "mcp.tool.succeeded",
                call_id = %call.id,
                tool = %name,
                "Tool call succeeded"
            );
        }

        ToolCallResult {
            call_id: call.id.clone(),
            name: name.to_string(),
            arguments,
            output,
        }
    }
}

/// Parse the argument string and check it against the tool's declared schema.
fn prepare_arguments(name: &str, raw: &str, tools: &[ToolDescriptor]) -> Result<JsonObject> {
    let args = parse_arguments(name, raw)?;
    let tool = tools
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| ClientError::tool(name, "unknown tool"))?;
    validate_arguments(tool, &args)?;
    Ok(args)
}

/// Convert a tool listing to the `OpenAI` function-calling schema.
#[must_use]
pub fn format_tools(tools: &[ToolDescriptor]) -> Vec<Value> {
    tools.iter().map(format_tool).collect()
}

fn format_tool(tool: &ToolDescriptor) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.as_deref().unwrap_or(""),
            "parameters": tool.input_schema,
        }
    })
}

/// Models sometimes send an empty string for "no arguments".
pub(crate) fn parse_arguments(tool: &str, raw: &str) -> Result<JsonObject> {
    if raw.trim().is_empty() {
        return Ok(JsonObject::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(JsonObject::new()),
        Ok(other) => Err(ClientError::tool(
            tool,
            format!("arguments must be a JSON object, got {other}"),
        )),
        Err(e) => Err(ClientError::tool(tool, format!("malformed arguments: {e}"))),
    }
}

/// Shallow check against the JSON schema: required keys and primitive property types.
pub(crate) fn validate_arguments(tool: &ToolDescriptor, args: &JsonObject) -> Result<()> {
    let schema = &tool.input_schema;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(ClientError::MissingArgument {
                    target: tool.name.clone(),
                    argument: key.to_string(),
                });
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(expected) = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        if !matches_type(expected, value) {
            return Err(ClientError::tool(
                &tool.name,
                format!("argument '{key}' should be of type {expected}"),
            ));
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// Transcript line announcing a tool call.
#[must_use]
pub fn format_call_for_display(name: &str, arguments: &Value) -> String {
    format!("[Calling tool {name} with args {arguments}]")
}

/// Render a tool result for the terminal, keeping part order.
#[must_use]
pub fn format_result_for_display(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Content(parts) => join_parts(parts),
        ToolOutput::Structured { value, content } => {
            if content.is_empty() {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            } else {
                join_parts(content)
            }
        }
        ToolOutput::Error(message) => format!("Error: {message}"),
    }
}

//! Connection to a single MCP server.
//!
//! [`McpSession`] is the seam the managers talk to. [`RmcpSession`] is the
//! production implementation on top of the `rmcp` SDK; tests substitute an
//! in-memory server.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, GetPromptRequestParam, ReadResourceRequestParam},
    service::{Peer, RoleClient, RunningService},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::{process::Command, sync::Mutex};

use crate::error::{ClientError, Result};
use crate::mcp::config::ServerTarget;
use crate::mcp::types::{
    CallToolWire, JsonObject, PromptDescriptor, RenderedPrompt, ResourceContent,
    ResourceDescriptor, ToolDescriptor, ToolOutput,
};

/// Typed operations against one connected MCP server.
///
/// Implementations hold no conversation state; they are shared by the tool,
/// resource and prompt managers behind an `Arc`.
#[async_trait]
pub trait McpSession: Send + Sync + std::fmt::Debug {
    /// `tools/list`, all pages. Empty when the server has no tools capability.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// `tools/call`. Protocol-level failures map to [`ClientError::ToolExecution`];
    /// a result flagged `isError` comes back as [`ToolOutput::Error`].
    async fn call_tool(&self, name: &str, arguments: Option<JsonObject>) -> Result<ToolOutput>;

    /// `resources/list`, all pages. Empty when the server has no resources capability.
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>>;

    /// `resources/read`. Fails with [`ClientError::ResourceNotFound`].
    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>>;

    /// `prompts/list`, all pages. Empty when the server has no prompts capability.
    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>>;

    /// `prompts/get`. Fails with [`ClientError::PromptNotFound`].
    async fn get_prompt(
        &self,
        name: &str,
        arguments: BTreeMap<String, String>,
    ) -> Result<RenderedPrompt>;

    /// Release the transport. Calling it twice is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Which optional MCP features the server advertised during `initialize`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
}

type ClientService = RunningService<RoleClient, ()>;

/// [`McpSession`] backed by an `rmcp` client service.
pub struct RmcpSession {
    server_name: String,
    capabilities: ServerCapabilities,
    peer: Peer<RoleClient>,
    service: Mutex<Option<ClientService>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for RmcpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpSession")
            .field("server_name", &self.server_name)
            .field("capabilities", &self.capabilities)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl RmcpSession {
    /// Establish the transport and run the MCP `initialize` handshake.
    ///
    /// A child process that cannot be spawned, or an HTTP endpoint that cannot
    /// be reached, yields [`ClientError::Connection`]. A stdio server that
    /// starts but fails the handshake yields [`ClientError::Protocol`].
    pub async fn connect(target: &ServerTarget) -> Result<Self> {
        let described = target.describe();

        let service: ClientService = match target {
            ServerTarget::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                cmd.args(args);
                for (k, v) in env {
                    cmd.env(k, v);
                }

                let transport = TokioChildProcess::new(cmd).map_err(|e| {
                    ClientError::Connection(format!("failed to spawn MCP server '{described}': {e}"))
                })?;

                ().serve(transport).await.map_err(|e| {
                    ClientError::Protocol(format!("initialize failed for '{described}': {e}"))
                })?
            }
            ServerTarget::Http { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.to_string());
                ().serve(transport).await.map_err(|e| {
                    ClientError::Connection(format!(
                        "failed to connect to MCP server '{described}': {e}"
                    ))
                })?
            }
        };

        let (server_name, capabilities) = match service.peer_info() {
            Some(info) => (
                info.server_info.name.clone(),
                ServerCapabilities {
                    tools: info.capabilities.tools.is_some(),
                    resources: info.capabilities.resources.is_some(),
                    prompts: info.capabilities.prompts.is_some(),
                },
            ),
            None => (described.clone(), ServerCapabilities::default()),
        };

        tracing::info!(
            name: "mcp.session.connected",
            target = %described,
            server = %server_name,
            tools = capabilities.tools,
            resources = capabilities.resources,
            prompts = capabilities.prompts,
            "MCP session initialized"
        );

        let peer = service.peer().clone();
        Ok(Self {
            server_name,
            capabilities,
            peer,
            service: Mutex::new(Some(service)),
            closed: AtomicBool::new(false),
        })
    }

    /// Name the server reported in its `initialize` result.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Connection("session is closed".into()));
        }
        Ok(())
    }
}

/// Re-decode an SDK value through its wire format into our own types.
fn decode<T: DeserializeOwned>(value: &impl Serialize, what: &str) -> Result<T> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value::<T>)
        .map_err(|e| ClientError::Protocol(format!("unexpected {what} payload: {e}")))
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_open()?;
        if !self.capabilities.tools {
            return Ok(Vec::new());
        }
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| ClientError::Protocol(format!("tools/list failed: {e}")))?;
        decode(&tools, "tools/list")
    }

    async fn call_tool(&self, name: &str, arguments: Option<JsonObject>) -> Result<ToolOutput> {
        self.ensure_open()?;
        let res = self
            .peer
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| ClientError::tool(name, e))?;
        let wire: CallToolWire = decode(&res, "tools/call")?;
        Ok(wire.into())
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        self.ensure_open()?;
        if !self.capabilities.resources {
            return Ok(Vec::new());
        }
        let resources = self
            .peer
            .list_all_resources()
            .await
            .map_err(|e| ClientError::Protocol(format!("resources/list failed: {e}")))?;
        decode(&resources, "resources/list")
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>> {
        self.ensure_open()?;
        let res = self
            .peer
            .read_resource(ReadResourceRequestParam {
                uri: uri.to_string(),
            })
            .await
            .map_err(|e| ClientError::ResourceNotFound {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        decode(&res.contents, "resources/read")
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>> {
        self.ensure_open()?;
        if !self.capabilities.prompts {
            return Ok(Vec::new());
        }
        let prompts = self
            .peer
            .list_all_prompts()
            .await
            .map_err(|e| ClientError::Protocol(format!("prompts/list failed: {e}")))?;
        decode(&prompts, "prompts/list")
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: BTreeMap<String, String>,
    ) -> Result<RenderedPrompt> {
        self.ensure_open()?;
        let arguments: JsonObject = arguments
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        let res = self
            .peer
            .get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| ClientError::PromptNotFound {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        decode(&res, "prompts/get")
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let service = self.service.lock().await.take();
        if let Some(service) = service {
            let reason = service
                .cancel()
                .await
                .map_err(|e| ClientError::Connection(format!("MCP service task failed: {e}")))?;
            tracing::info!(
                name: "mcp.session.closed",
                server = %self.server_name,
                reason = ?reason,
                "MCP session closed"
            );
        }
        Ok(())
    }
}

//! Caller-facing MCP chat client.
//!
//! [`McpClient`] ties one MCP session to one conversation: it owns the chat
//! processor (and with it the history), the three managers, and the
//! auto-resource setting.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::chat::{ChatProcessor, ChatTurn, DEFAULT_MAX_ROUNDS};
use crate::conversation::ConversationHistory;
use crate::error::Result;
use crate::llm::{LlmClient, Message};
use crate::mcp::prompts::collect_arguments;
use crate::mcp::types::{PromptDescriptor, ResourceContent, ResourceDescriptor, ToolDescriptor};
use crate::mcp::{
    ArgumentPrompter, McpSession, PromptManager, RelevancePolicy, ResourceManager, RmcpSession,
    ServerTarget, ToolManager,
};

/// Per-client behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientOptions {
    /// Round bound for each chat turn.
    pub max_rounds: usize,
    /// Prefix queries with the text of relevant resources.
    pub auto_resources: bool,
    pub relevance: RelevancePolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            auto_resources: false,
            relevance: RelevancePolicy::default(),
        }
    }
}

/// What the server offered at connect time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSummary {
    pub server_name: String,
    pub tools: Vec<ToolDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
}

impl fmt::Display for ConnectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.tools.iter().map(|t| t.name.as_str()).collect();
        writeln!(f, "Connected to {} with tools: {names:?}", self.server_name)?;
        for tool in &self.tools {
            writeln!(
                f,
                "Tool: {}, Description: {}",
                tool.name,
                tool.description.as_deref().unwrap_or("")
            )?;
        }

        if self.resources.is_empty() {
            writeln!(f, "No resources available on this server.")?;
        } else {
            writeln!(f, "{} resources:", self.resources.len())?;
            for resource in &self.resources {
                writeln!(f, "Resource: {} ({})", resource.name, resource.uri)?;
            }
        }

        if self.prompts.is_empty() {
            write!(f, "No prompts available on this server.")
        } else {
            write!(f, "{} prompts:", self.prompts.len())?;
            for prompt in &self.prompts {
                write!(f, "\nPrompt: {}", prompt.name)?;
            }
            Ok(())
        }
    }
}

/// Result of [`McpClient::use_prompt`].
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTurn {
    /// Messages the prompt rendered to, as appended to history.
    pub messages: Vec<Message>,
    pub turn: ChatTurn,
}

/// One MCP server plus one LLM conversation.
#[derive(Debug)]
pub struct McpClient {
    session: Arc<dyn McpSession>,
    server_name: String,
    resources: ResourceManager,
    prompts: PromptManager,
    tools: ToolManager,
    processor: ChatProcessor,
    auto_resources: bool,
    relevance: RelevancePolicy,
}

impl McpClient {
    /// Connect to `target` and prepare a conversation driven by `llm`.
    ///
    /// # Errors
    ///
    /// [`crate::ClientError::Connection`] or [`crate::ClientError::Protocol`]
    /// when the server cannot be reached or the handshake fails.
    pub async fn connect(
        target: &ServerTarget,
        llm: LlmClient,
        options: ClientOptions,
    ) -> Result<Self> {
        let session = RmcpSession::connect(target).await?;
        let server_name = session.server_name().to_string();
        Ok(Self::with_session(Arc::new(session), server_name, llm, options))
    }

    /// Build a client over an already established session.
    pub fn with_session(
        session: Arc<dyn McpSession>,
        server_name: impl Into<String>,
        llm: LlmClient,
        options: ClientOptions,
    ) -> Self {
        let tools = ToolManager::new(Arc::clone(&session));
        let processor =
            ChatProcessor::new(llm, tools.clone()).with_max_rounds(options.max_rounds);
        Self {
            resources: ResourceManager::new(Arc::clone(&session)),
            prompts: PromptManager::new(Arc::clone(&session)),
            tools,
            session,
            server_name: server_name.into(),
            processor,
            auto_resources: options.auto_resources,
            relevance: options.relevance,
        }
    }

    /// List everything the server offers.
    ///
    /// Resource and prompt listing failures are logged and reported as empty.
    ///
    /// # Errors
    ///
    /// Fails only if the tool listing fails.
    pub async fn summary(&self) -> Result<ConnectionSummary> {
        let tools = self.tools.list_tools().await?;
        let resources = self.resources.list_resources().await.unwrap_or_else(|e| {
            tracing::warn!(name: "mcp.resource.list_failed", error = %e, "Could not list resources");
            Vec::new()
        });
        let prompts = self.prompts.list_prompts().await.unwrap_or_else(|e| {
            tracing::warn!(name: "mcp.prompt.list_failed", error = %e, "Could not list prompts");
            Vec::new()
        });

        tracing::info!(
            name: "mcp.client.ready",
            server = %self.server_name,
            tools = tools.len(),
            resources = resources.len(),
            prompts = prompts.len(),
            "MCP client ready"
        );

        Ok(ConnectionSummary {
            server_name: self.server_name.clone(),
            tools,
            resources,
            prompts,
        })
    }

    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.processor.llm().model()
    }

    #[must_use]
    pub fn history(&self) -> &ConversationHistory {
        self.processor.llm().history()
    }

    #[must_use]
    pub fn auto_resources(&self) -> bool {
        self.auto_resources
    }

    /// Run one chat turn for `query`.
    ///
    /// With auto-resources on, the query is first prefixed with the text of
    /// relevant resources. If resources cannot be listed the plain query is used.
    ///
    /// # Errors
    ///
    /// LLM failures and tool listing failures.
    pub async fn process_query(&mut self, query: &str) -> Result<ChatTurn> {
        let query = if self.auto_resources {
            match self
                .resources
                .add_resource_context(query, &self.relevance)
                .await
            {
                Ok(enhanced) => enhanced,
                Err(e) => {
                    tracing::warn!(
                        name: "mcp.resource.context_failed",
                        error = %e,
                        "Continuing without resource context"
                    );
                    query.to_string()
                }
            }
        } else {
            query.to_string()
        };

        self.processor.process_query(&query).await
    }

    /// Render prompt `name`, append its messages to history and run a turn.
    ///
    /// Missing required arguments are requested from `prompter`; without one
    /// the call fails before the server is asked to render anything.
    ///
    /// # Errors
    ///
    /// [`crate::ClientError::PromptNotFound`],
    /// [`crate::ClientError::MissingArgument`], or any chat turn error.
    pub async fn use_prompt(
        &mut self,
        name: &str,
        provided: &BTreeMap<String, String>,
        prompter: Option<&dyn ArgumentPrompter>,
    ) -> Result<PromptTurn> {
        let descriptor = self.prompts.find_prompt(name).await?;
        let arguments = collect_arguments(&descriptor, provided, prompter).await?;
        let messages = self.prompts.render_prompt(name, arguments).await?;

        self.processor
            .llm_mut()
            .append_messages(messages.iter().cloned());
        let turn = self.processor.process_existing().await?;
        Ok(PromptTurn { messages, turn })
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.processor.llm_mut().set_model(model);
    }

    pub fn clear_history(&mut self) {
        self.processor.llm_mut().reset_history();
    }

    pub fn set_auto_resources(&mut self, enabled: bool) {
        self.auto_resources = enabled;
        tracing::info!(
            name: "mcp.client.auto_resources",
            enabled,
            "Automatic resource inclusion toggled"
        );
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.tools.list_tools().await
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        self.resources.list_resources().await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContent>> {
        self.resources.read_resource(uri).await
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>> {
        self.prompts.list_prompts().await
    }

    /// Close the MCP session. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Whatever the session reports while shutting down.
    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }
}

//! Command line and layered application configuration.
//!
//! Precedence, lowest first: built-in defaults, the config file (`--config`,
//! `CONFIG_FILE`, or `./config.{yaml,toml,json}`), `MCP_CHAT__*` environment
//! variables (e.g. `MCP_CHAT__LLM__MODEL`), then explicit CLI flags.
//! API keys are read from `LLM_API_KEY` or `OPENROUTER_API_KEY` only and never
//! pass through the config layers.

use std::path::Path;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::chat::DEFAULT_MAX_ROUNDS;
use crate::client::ClientOptions;
use crate::error::{ClientError, Result};
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT, LlmSettings, Provider};
use crate::mcp::{RelevancePolicy, ServerTarget};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-5-sonnet-20241022";

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "Chat with an LLM that can use an MCP server's tools", long_about = None)]
pub struct Cli {
    /// Server script (`.py`/`.js`) or streamable HTTP URL
    pub server: Option<String>,

    /// `mcp.json`-style file to pick the server from
    #[arg(long, env = "MCP_CONFIG")]
    pub mcp_config: Option<String>,

    /// Server entry to use from `--mcp-config`
    #[arg(long)]
    pub server_name: Option<String>,

    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Model identifier
    #[arg(long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Base URL of the `OpenAI`-compatible API
    #[arg(long, env = "LLM_BASE_URL")]
    pub base_url: Option<String>,

    /// Maximum completion rounds per query
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Start with automatic resource inclusion on or off
    #[arg(long)]
    pub auto_resources: Option<bool>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub resources: ResourcesConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChatConfig {
    pub max_rounds: usize,
    pub auto_resources: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ResourcesConfig {
    pub relevance_threshold: f64,
    pub max_auto_resources: usize,
    pub max_context_chars: usize,
}

impl AppConfig {
    /// Parse `args` as a command line and load the configuration they point at.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] on bad arguments or unreadable configuration.
    pub fn load_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ClientError::Config(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// # Errors
    ///
    /// See [`AppConfig::load_from_args`].
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("llm.base_url", DEFAULT_BASE_URL)?
            .set_default("llm.model", DEFAULT_MODEL)?
            .set_default("llm.max_tokens", 1000)?
            .set_default("llm.request_timeout_secs", 120)?
            .set_default("chat.max_rounds", DEFAULT_MAX_ROUNDS as u64)?
            .set_default("chat.auto_resources", false)?
            .set_default("resources.relevance_threshold", 0.0)?
            .set_default("resources.max_auto_resources", 3)?
            .set_default("resources.max_context_chars", 1000)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path)).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("MCP_CHAT")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(model) = &cli.model {
            builder = builder.set_override("llm.model", model.as_str())?;
        }
        if let Some(base_url) = &cli.base_url {
            builder = builder.set_override("llm.base_url", base_url.as_str())?;
        }
        if let Some(max_rounds) = cli.max_rounds {
            builder = builder.set_override("chat.max_rounds", max_rounds as u64)?;
        }
        if let Some(auto) = cli.auto_resources {
            builder = builder.set_override("chat.auto_resources", auto)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(ClientError::Config("llm.model cannot be empty".into()));
        }
        url::Url::parse(&self.llm.base_url).map_err(|e| {
            ClientError::Config(format!("llm.base_url '{}' is not a URL: {e}", self.llm.base_url))
        })?;
        if !(0.0..=1.0).contains(&self.resources.relevance_threshold) {
            return Err(ClientError::Config(
                "resources.relevance_threshold must be between 0 and 1".into(),
            ));
        }
        if self.chat.max_rounds == 0 {
            return Err(ClientError::Config("chat.max_rounds must be at least 1".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            max_rounds: self.chat.max_rounds,
            auto_resources: self.chat.auto_resources,
            relevance: RelevancePolicy {
                threshold: self.resources.relevance_threshold,
                max_resources: self.resources.max_auto_resources,
                max_context_chars: self.resources.max_context_chars,
            },
        }
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.llm
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Build [`LlmSettings`] from the loaded configuration plus credentials from
/// the environment.
#[must_use]
pub fn load_llm_settings(cfg: &AppConfig) -> LlmSettings {
    let api_key = ["LLM_API_KEY", "OPENROUTER_API_KEY"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|s| !s.trim().is_empty()));

    let mut provider = Provider::detect_from_url(&cfg.llm.base_url);

    if let Provider::AzureOpenAI { api_version, .. } = &provider {
        let deployment_name = std::env::var("AZURE_DEPLOYMENT_NAME").unwrap_or_default();
        let api_version = std::env::var("AZURE_API_VERSION").unwrap_or_else(|_| api_version.clone());
        provider = Provider::AzureOpenAI {
            deployment_name,
            api_version,
        };
    }

    LlmSettings {
        base_url: cfg.llm.base_url.clone(),
        api_key,
        model: cfg.llm.model.clone(),
        provider,
        max_tokens: Some(cfg.llm.max_tokens),
        parallel_tool_calls: cfg.llm.parallel_tool_calls,
        request_timeout_secs: cfg.llm.request_timeout_secs,
    }
}

/// Work out which MCP server to connect to.
///
/// # Errors
///
/// [`ClientError::InvalidTarget`] for an unusable positional argument,
/// [`ClientError::Config`] when no server is given at all or the
/// `--mcp-config` file cannot be used.
pub fn resolve_server_target(cli: &Cli) -> Result<ServerTarget> {
    match (&cli.server, &cli.mcp_config) {
        (Some(arg), _) => ServerTarget::from_arg(arg),
        (None, Some(path)) => ServerTarget::from_config_file(path, cli.server_name.as_deref()),
        (None, None) => Err(ClientError::Config(
            "no MCP server given: pass a script path or URL, or --mcp-config".into(),
        )),
    }
}

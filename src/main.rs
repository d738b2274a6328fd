//! `mcp-chat`: interactive chat against one MCP server.
//!
//! ```text
//! mcp-chat servers/weather/weather.py
//! mcp-chat https://mcp.example.com/mcp --model openai/gpt-4o
//! mcp-chat --mcp-config mcp.json --server-name weather --log-json
//! ```

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use mcp_chat_client::config::{AppConfig, Cli, load_llm_settings, resolve_server_target};
use mcp_chat_client::llm::{ChatCompletionsDriver, LlmClient};
use mcp_chat_client::repl::{self, LineReader};
use mcp_chat_client::McpClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env-backed flags
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cfg = AppConfig::from_cli(&cli).context("failed to load configuration")?;
    let settings = load_llm_settings(&cfg);
    if settings.api_key.is_none() {
        warn!(
            name: "llm.config.no_api_key",
            "Neither LLM_API_KEY nor OPENROUTER_API_KEY is set"
        );
    }

    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        provider = ?settings.provider,
        "LLM configuration loaded"
    );

    let target = resolve_server_target(&cli).context("failed to determine MCP server")?;
    let driver = Arc::new(ChatCompletionsDriver::new(settings)?);
    let llm = LlmClient::new(driver, cfg.llm.model.clone(), cfg.system_prompt());

    let mut client = McpClient::connect(&target, llm, cfg.client_options())
        .await
        .with_context(|| format!("failed to connect to MCP server {}", target.describe()))?;

    let outcome = async {
        let summary = client.summary().await?;
        println!("\n{summary}");

        let input = LineReader::new(BufReader::new(tokio::io::stdin()));
        tokio::select! {
            res = repl::run(&mut client, &input) => res,
            _ = tokio::signal::ctrl_c() => {
                info!(name: "repl.interrupted", "Interrupted, shutting down");
                Ok(())
            }
        }
    }
    .await;

    if let Err(e) = client.close().await {
        warn!(name: "mcp.session.close_failed", error = %e, "Failed to close MCP session");
    }

    outcome.context("chat session ended with an error")
}

/// Install the subscriber. Logs go to stderr so they never mix with replies.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

//! MCP chat client
//!
//! Connects to one Model Context Protocol server and lets an
//! OpenAI-compatible LLM use its tools, resources and prompts in a multi-turn
//! conversation.
//!
//! # Architecture
//!
//! - **MCP session**: rmcp client over a child process (stdio) or streamable HTTP
//! - **Managers**: tools, resources and prompts reshaped for the chat loop
//! - **LLM client**: non-streaming Chat Completions driver plus owned history
//! - **Chat processor**: bounded tool-call loop with per-round commits
//!
//! # Modules
//!
//! - [`mcp`]: session, server targets and the three managers
//! - [`llm`]: message model, provider detection, backend trait and driver
//! - [`conversation`]: append-only history
//! - [`chat`]: the tool loop
//! - [`client`]: [`client::McpClient`], the caller-facing entry point
//! - [`config`]: CLI and layered configuration
//! - [`repl`]: the interactive command loop

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod repl;

pub use client::{ClientOptions, McpClient};
pub use error::{ClientError, Result};

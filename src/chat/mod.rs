//! The bounded tool-call loop between the LLM and the MCP server.

mod processor;

pub use processor::{ChatProcessor, ChatState, ChatTurn, DEFAULT_MAX_ROUNDS, StopReason};

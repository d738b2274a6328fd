//! Chat processor with a bounded tool loop.
//!
//! One turn:
//! 1. Ask the model for the next message over the current history
//! 2. If it requests tools, run them one by one in the order given
//! 3. Commit the assistant message and its tool results to history together
//! 4. Repeat until the model answers without tools or the round bound is hit
//!
//! Each round is staged locally and committed in one step, so dropping the
//! future mid-round leaves history exactly as it was after the previous round.

use std::fmt;

use uuid::Uuid;

use crate::error::Result;
use crate::llm::{LlmClient, Message};
use crate::mcp::ToolManager;
use crate::mcp::tools::{format_call_for_display, format_tools};

/// Rounds allowed per turn unless configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Where the processor is in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    AwaitingUserInput,
    LlmPending,
    ToolCallsPending,
    ToolExecuting,
    Done,
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered without requesting tools.
    Completed,
    /// The round bound was reached while the model still wanted tools.
    RoundLimit,
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Final assistant text. Empty if the model never produced any.
    pub reply: String,
    /// Assistant texts and `[Calling tool ...]` lines, in the order they happened.
    pub transcript: Vec<String>,
    /// Completion requests made during the turn.
    pub rounds: usize,
    pub stop: StopReason,
}

impl fmt::Display for ChatTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.transcript.join("\n"))
    }
}

/// Drives the conversation between an [`LlmClient`] and a [`ToolManager`].
#[derive(Debug)]
pub struct ChatProcessor {
    llm: LlmClient,
    tools: ToolManager,
    max_rounds: usize,
    state: ChatState,
}

impl ChatProcessor {
    pub fn new(llm: LlmClient, tools: ToolManager) -> Self {
        Self {
            llm,
            tools,
            max_rounds: DEFAULT_MAX_ROUNDS,
            state: ChatState::AwaitingUserInput,
        }
    }

    /// Set the round bound. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    #[must_use]
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    #[must_use]
    pub fn state(&self) -> ChatState {
        self.state
    }

    #[must_use]
    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn llm_mut(&mut self) -> &mut LlmClient {
        &mut self.llm
    }

    /// Append `query` as a user message and run the tool loop.
    ///
    /// # Errors
    ///
    /// LLM failures and tool listing failures propagate. The user message
    /// stays in history either way.
    pub async fn process_query(&mut self, query: &str) -> Result<ChatTurn> {
        self.llm.append_user_message(query);
        self.process_existing().await
    }

    /// Run the tool loop over whatever history already holds.
    ///
    /// # Errors
    ///
    /// See [`ChatProcessor::process_query`].
    pub async fn process_existing(&mut self) -> Result<ChatTurn> {
        let result = self.run_loop().await;
        self.state = match result {
            Ok(_) => ChatState::Done,
            Err(_) => ChatState::AwaitingUserInput,
        };
        result
    }

    async fn run_loop(&mut self) -> Result<ChatTurn> {
        let request_id = Uuid::new_v4().to_string();
        let conversation_id = self.llm.history().id().to_string();

        let tool_snapshot = self.tools.list_tools().await?;
        let formatted_tools = format_tools(&tool_snapshot);

        tracing::info!(
            name: "chat.turn.started",
            request_id = %request_id,
            conversation_id = %conversation_id,
            message_count = self.llm.conversation_len(),
            tool_count = formatted_tools.len(),
            "Starting chat turn"
        );

        let mut transcript = Vec::new();
        let mut last_text: Option<String> = None;

        for round in 1..=self.max_rounds {
            self.state = ChatState::LlmPending;
            tracing::debug!(
                name: "chat.round.started",
                request_id = %request_id,
                round,
                message_count = self.llm.conversation_len(),
                "Starting chat round"
            );

            let reply = match self.llm.complete(&formatted_tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(
                        name: "chat.round.llm_failed",
                        request_id = %request_id,
                        round,
                        error = %e,
                        "LLM request failed"
                    );
                    return Err(e);
                }
            };

            if let Some(text) = reply.content.as_deref().filter(|t| !t.is_empty()) {
                transcript.push(text.to_string());
                last_text = Some(text.to_string());
            }

            if !reply.has_tool_calls() {
                self.llm.append_assistant_message(reply);
                tracing::info!(
                    name: "chat.turn.completed",
                    request_id = %request_id,
                    rounds = round,
                    "Chat turn completed"
                );
                return Ok(ChatTurn {
                    reply: last_text.unwrap_or_default(),
                    transcript,
                    rounds: round,
                    stop: StopReason::Completed,
                });
            }

            self.state = ChatState::ToolCallsPending;
            let calls = reply.tool_calls.clone();
            tracing::info!(
                name: "chat.round.tool_calls",
                request_id = %request_id,
                round,
                tool_call_count = calls.len(),
                "Model requested tools"
            );

            let mut staged = Vec::with_capacity(calls.len() + 1);
            staged.push(Message::from(reply));

            self.state = ChatState::ToolExecuting;
            for call in &calls {
                let result = self.tools.execute_tool(call, &tool_snapshot).await;
                transcript.push(format_call_for_display(&result.name, &result.arguments));
                staged.push(Message::tool_result(
                    result.call_id,
                    result.output.to_model_text(),
                ));
            }

            self.llm.append_messages(staged);
        }

        tracing::warn!(
            name: "chat.turn.round_limit",
            request_id = %request_id,
            max_rounds = self.max_rounds,
            "Round limit reached with tool calls still being requested"
        );

        Ok(ChatTurn {
            reply: last_text.unwrap_or_default(),
            transcript,
            rounds: self.max_rounds,
            stop: StopReason::RoundLimit,
        })
    }
}

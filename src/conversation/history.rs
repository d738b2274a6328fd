//! Append-only message history.

use std::collections::HashSet;

use uuid::Uuid;

use crate::llm::{AssistantMessage, Message, MessageRole};

/// Ordered conversation messages, system prompt first.
///
/// Invariants: index 0 is the only system message, and messages are only
/// ever appended. [`ConversationHistory::reset`] is the single exception and
/// truncates back to the system message.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    id: String,
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Create a history holding only the system prompt.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Identifier used to correlate log events of one conversation.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.messages.first().map_or("", Message::text)
    }

    /// All messages, including the system prompt.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages, including the system prompt.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, message: AssistantMessage) {
        self.messages.push(message.into());
    }

    pub fn push_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message::tool_result(tool_call_id, content));
    }

    /// Append a message. System messages are dropped with a warning.
    pub fn push(&mut self, message: Message) {
        if message.role == MessageRole::System {
            tracing::warn!(
                name: "conversation.system_message_rejected",
                conversation_id = %self.id,
                "Ignoring extra system message"
            );
            return;
        }
        self.messages.push(message);
    }

    /// Append several messages in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.push(message);
        }
    }

    /// Drop everything except the system prompt.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
        tracing::debug!(
            name: "conversation.reset",
            conversation_id = %self.id,
            "Conversation history cleared"
        );
    }

    /// Whether every tool message answers a call made by an earlier assistant
    /// message, and each call is answered at most once.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let system_count = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .count();
        if system_count != 1 || self.messages[0].role != MessageRole::System {
            return false;
        }

        let mut open: HashSet<&str> = HashSet::new();
        for message in &self.messages {
            match message.role {
                MessageRole::Assistant => {
                    for call in message.tool_calls.iter().flatten() {
                        open.insert(call.id.as_str());
                    }
                }
                MessageRole::Tool => {
                    let Some(id) = message.tool_call_id.as_deref() else {
                        return false;
                    };
                    if !open.remove(id) {
                        return false;
                    }
                }
                MessageRole::System | MessageRole::User => {}
            }
        }
        true
    }
}

//! Conversation state for one chat session.
//!
//! A [`ConversationHistory`] is owned by exactly one [`crate::llm::LlmClient`];
//! there is no shared or global store. Mutation goes through `&mut self`, so
//! the borrow checker guarantees a single writer.
//!
//! ```rust
//! use mcp_chat_client::conversation::ConversationHistory;
//!
//! let mut history = ConversationHistory::new("You are a helpful assistant.");
//! history.push_user("Hello!");
//! assert_eq!(history.message_count(), 2);
//!
//! history.reset();
//! assert_eq!(history.message_count(), 1);
//! ```

mod history;

pub use history::ConversationHistory;

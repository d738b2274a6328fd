//! Error taxonomy for the MCP chat client.
//!
//! Variants fall into three groups:
//!
//! - **Fatal to the session**: [`ClientError::Connection`] and
//!   [`ClientError::Protocol`]. The caller must reconnect.
//! - **Recoverable**: tool, resource and prompt failures. Inside the chat loop
//!   these are turned into tool-result text so the model can react to them.
//! - **Turn failures**: [`ClientError::LlmUnavailable`] and
//!   [`ClientError::LlmProtocol`]. The user message stays in history so the
//!   same query can be retried.

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to an MCP server or the LLM provider.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server process or transport could not be established, or the
    /// session has already been closed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The MCP handshake failed or the server answered outside the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server target could not be interpreted.
    #[error("invalid server target '{target}': {reason}")]
    InvalidTarget {
        /// The target as given by the caller.
        target: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A tool call failed on the server or its arguments were rejected.
    #[error("tool '{tool}' failed: {reason}")]
    ToolExecution {
        /// Tool name.
        tool: String,
        /// Failure detail.
        reason: String,
    },

    /// The server has no resource at the given URI (or refused to read it).
    #[error("resource not found: {uri} ({reason})")]
    ResourceNotFound {
        /// Requested URI.
        uri: String,
        /// Failure detail.
        reason: String,
    },

    /// The server has no prompt with the given name (or refused to render it).
    #[error("prompt not found: {name} ({reason})")]
    PromptNotFound {
        /// Requested prompt name.
        name: String,
        /// Failure detail.
        reason: String,
    },

    /// A required argument was not supplied.
    #[error("missing required argument '{argument}' for '{target}'")]
    MissingArgument {
        /// Prompt or tool the argument belongs to.
        target: String,
        /// Argument name.
        argument: String,
    },

    /// The LLM endpoint could not be reached or answered with a non-2xx status.
    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    /// The LLM endpoint answered with something that is not a chat completion.
    #[error("LLM protocol error: {0}")]
    LlmProtocol(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the session has to be recreated after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Protocol(_))
    }

    /// Whether this error can be reported back to the model as a tool result.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ToolExecution { .. }
                | Self::ResourceNotFound { .. }
                | Self::PromptNotFound { .. }
                | Self::MissingArgument { .. }
        )
    }

    pub(crate) fn tool(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ClientError::Connection("gone".into()).is_fatal());
        assert!(ClientError::Protocol("bad version".into()).is_fatal());
        assert!(!ClientError::LlmUnavailable("503".into()).is_fatal());
        assert!(!ClientError::tool("get_forecast", "boom").is_fatal());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(ClientError::tool("get_forecast", "boom").is_recoverable());
        assert!(
            ClientError::ResourceNotFound {
                uri: "file:///x".into(),
                reason: "missing".into(),
            }
            .is_recoverable()
        );
        assert!(!ClientError::LlmProtocol("no choices".into()).is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ClientError::MissingArgument {
            target: "summarize".into(),
            argument: "topic".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing required argument 'topic' for 'summarize'"
        );
    }
}

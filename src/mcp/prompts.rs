//! Prompt templates: listing, argument collection and rendering.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ClientError, Result};
use crate::llm::{Message, MessageRole};
use crate::mcp::session::McpSession;
use crate::mcp::types::{PromptArgumentSpec, PromptDescriptor, PromptRole};

/// Interactive fallback for prompt arguments the caller did not supply.
#[async_trait]
pub trait ArgumentPrompter: Send + Sync {
    /// Ask for a value. `None` means the user gave up (e.g. end of input).
    async fn ask(&self, prompt: &PromptDescriptor, argument: &PromptArgumentSpec)
    -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct PromptManager {
    session: Arc<dyn McpSession>,
}

impl PromptManager {
    pub fn new(session: Arc<dyn McpSession>) -> Self {
        Self { session }
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>> {
        self.session.list_prompts().await
    }

    /// Look a prompt up by name in a fresh listing.
    pub async fn find_prompt(&self, name: &str) -> Result<PromptDescriptor> {
        self.list_prompts()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ClientError::PromptNotFound {
                name: name.to_string(),
                reason: "not listed by server".to_string(),
            })
    }

    /// Fetch the rendered prompt and convert it into chat messages.
    ///
    /// Roles and order are kept exactly as the server returned them.
    pub async fn render_prompt(
        &self,
        name: &str,
        arguments: BTreeMap<String, String>,
    ) -> Result<Vec<Message>> {
        let rendered = self.session.get_prompt(name, arguments).await?;

        tracing::debug!(
            name: "mcp.prompt.rendered",
            prompt = %name,
            message_count = rendered.messages.len(),
            "Prompt rendered"
        );

        Ok(rendered
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    PromptRole::User => MessageRole::User,
                    PromptRole::Assistant => MessageRole::Assistant,
                };
                Message::new(role, m.content.render())
            })
            .collect())
    }
}

/// Resolve the arguments for `prompt`.
///
/// Declared arguments are taken from `provided`; a required argument that is
/// missing or blank is asked for through `prompter`. Without a prompter (or
/// when it gives up) this fails with [`ClientError::MissingArgument`] before
/// the server is contacted. Blank optional values are dropped and undeclared
/// keys are ignored.
pub async fn collect_arguments(
    prompt: &PromptDescriptor,
    provided: &BTreeMap<String, String>,
    prompter: Option<&dyn ArgumentPrompter>,
) -> Result<BTreeMap<String, String>> {
    let mut arguments = BTreeMap::new();

    for arg in &prompt.arguments {
        let given = provided
            .get(&arg.name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let value = match (given, arg.required, prompter) {
            (Some(v), _, _) => Some(v),
            (None, false, _) => None,
            (None, true, Some(prompter)) => prompter
                .ask(prompt, arg)
                .await
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            (None, true, None) => None,
        };

        match value {
            Some(v) => {
                arguments.insert(arg.name.clone(), v);
            }
            None if arg.required => {
                return Err(ClientError::MissingArgument {
                    target: prompt.name.clone(),
                    argument: arg.name.clone(),
                });
            }
            None => {}
        }
    }

    for key in provided.keys() {
        if !prompt.arguments.iter().any(|a| &a.name == key) {
            tracing::warn!(
                name: "mcp.prompt.unknown_argument",
                prompt = %prompt.name,
                argument = %key,
                "Ignoring argument the prompt does not declare"
            );
        }
    }

    Ok(arguments)
}

/// Numbered listing for the `prompts` command.
#[must_use]
pub fn format_prompts_list(prompts: &[PromptDescriptor]) -> String {
    if prompts.is_empty() {
        return "No prompts available.".to_string();
    }

    let mut output = vec![format!("Available Prompts ({}):", prompts.len())];
    for (i, prompt) in prompts.iter().enumerate() {
        output.push(format!("{}. {}", i + 1, prompt.name));
        if let Some(description) = &prompt.description {
            output.push(format!("   Description: {description}"));
        }
        if !prompt.arguments.is_empty() {
            output.push("   Arguments:".to_string());
            for arg in &prompt.arguments {
                let required = if arg.required { " (required)" } else { " (optional)" };
                output.push(format!(
                    "     - {}{required}: {}",
                    arg.name,
                    arg.description.as_deref().unwrap_or("No description")
                ));
            }
        }
        output.push(String::new());
    }
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize_prompt() -> PromptDescriptor {
        PromptDescriptor {
            name: "summarize".into(),
            description: Some("Summarize a topic".into()),
            arguments: vec![
                PromptArgumentSpec {
                    name: "topic".into(),
                    description: Some("What to summarize".into()),
                    required: true,
                },
                PromptArgumentSpec {
                    name: "tone".into(),
                    description: None,
                    required: false,
                },
            ],
        }
    }

    struct FixedAnswer(Option<&'static str>);

    #[async_trait]
    impl ArgumentPrompter for FixedAnswer {
        async fn ask(&self, _prompt: &PromptDescriptor, _arg: &PromptArgumentSpec) -> Option<String> {
            self.0.map(ToString::to_string)
        }
    }

    #[tokio::test]
    async fn test_missing_required_without_prompter() {
        let err = collect_arguments(&summarize_prompt(), &BTreeMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::MissingArgument { ref argument, .. } if argument == "topic"
        ));
    }

    #[tokio::test]
    async fn test_blank_required_counts_as_missing() {
        let provided = BTreeMap::from([("topic".to_string(), "   ".to_string())]);
        let result = collect_arguments(&summarize_prompt(), &provided, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_prompter_fills_required() {
        let args = collect_arguments(
            &summarize_prompt(),
            &BTreeMap::new(),
            Some(&FixedAnswer(Some(" rust "))),
        )
        .await
        .unwrap();
        assert_eq!(args.get("topic").map(String::as_str), Some("rust"));
        assert!(!args.contains_key("tone"));
    }

    #[tokio::test]
    async fn test_prompter_giving_up_fails() {
        let result = collect_arguments(
            &summarize_prompt(),
            &BTreeMap::new(),
            Some(&FixedAnswer(None)),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_undeclared_arguments_are_dropped() {
        let provided = BTreeMap::from([
            ("topic".to_string(), "mcp".to_string()),
            ("color".to_string(), "blue".to_string()),
        ]);
        let args = collect_arguments(&summarize_prompt(), &provided, None)
            .await
            .unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_format_prompts_list() {
        let listing = format_prompts_list(&[summarize_prompt()]);
        assert!(listing.contains("1. summarize"));
        assert!(listing.contains("     - topic (required): What to summarize"));
        assert!(listing.contains("     - tone (optional): No description"));
    }
}

//! Interactive command loop for the `mcp-chat` binary.

use std::collections::BTreeMap;
use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::Mutex;

use crate::client::McpClient;
use crate::error::Result;
use crate::mcp::ArgumentPrompter;
use crate::mcp::resources::{format_resource_contents, format_resources_list};
use crate::mcp::prompts::format_prompts_list;
use crate::mcp::types::{PromptArgumentSpec, PromptDescriptor};

pub const HELP_TEXT: &str = "Commands:
  <text>                      ask the model
  clear                       reset chat history
  model <id>                  switch model (no id: show current)
  resources                   list available resources
  read <uri>                  read a specific resource
  prompts                     list available prompts
  prompt <name> [k=v ...]     use a prompt
  auto-resources on|off       toggle automatic resource inclusion
  help                        show this help
  quit                        exit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    Clear,
    Help,
    Model(Option<String>),
    Resources,
    Read(String),
    Prompts,
    Prompt {
        name: String,
        arguments: BTreeMap<String, String>,
    },
    AutoResources(bool),
    Query(String),
    /// Recognized command used wrongly; carries the usage line.
    Usage(&'static str),
}

/// Parse one input line. Keywords are case-insensitive; anything that is not
/// a command is a query.
#[must_use]
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match (head.to_lowercase().as_str(), rest) {
        ("quit" | "exit", "") => Command::Quit,
        ("clear", "") => Command::Clear,
        ("help", "") => Command::Help,
        ("resources", "") => Command::Resources,
        ("prompts", "") => Command::Prompts,
        ("model", "") => Command::Model(None),
        ("model", id) => Command::Model(Some(id.to_string())),
        ("read", "") => Command::Usage("Usage: read <uri>"),
        ("read", uri) => Command::Read(uri.to_string()),
        ("prompt", "") => Command::Usage("Usage: prompt <name> [key=value ...]"),
        ("prompt", rest) => parse_prompt(rest),
        ("auto-resources", setting) => match setting.to_lowercase().as_str() {
            "on" | "true" | "yes" => Command::AutoResources(true),
            "off" | "false" | "no" => Command::AutoResources(false),
            _ => Command::Usage("Usage: auto-resources on|off"),
        },
        _ => Command::Query(line.to_string()),
    }
}

fn parse_prompt(rest: &str) -> Command {
    let mut parts = rest.split_whitespace();
    let Some(name) = parts.next() else {
        return Command::Usage("Usage: prompt <name> [key=value ...]");
    };

    let mut arguments = BTreeMap::new();
    for part in parts {
        let Some((key, value)) = part.split_once('=') else {
            return Command::Usage("Usage: prompt <name> [key=value ...]");
        };
        if key.is_empty() {
            return Command::Usage("Usage: prompt <name> [key=value ...]");
        }
        arguments.insert(key.to_string(), value.to_string());
    }

    Command::Prompt {
        name: name.to_string(),
        arguments,
    }
}

/// Line source shared by the command loop and the argument prompter.
#[derive(Debug)]
pub struct LineReader<R> {
    lines: Mutex<Lines<R>>,
}

impl<R: AsyncBufRead + Unpin + Send> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    /// Print `prompt` and read one line. `None` at end of input.
    pub async fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(name: "repl.read_failed", error = %e, "Failed to read input");
                None
            }
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> ArgumentPrompter for LineReader<R> {
    async fn ask(&self, prompt: &PromptDescriptor, argument: &PromptArgumentSpec) -> Option<String> {
        let label = match &argument.description {
            Some(description) => format!("{} (required) - {description}", argument.name),
            None => format!("{} (required)", argument.name),
        };
        println!("Prompt '{}' needs a value:", prompt.name);

        loop {
            let value = self.read_line(&format!("{label}: ")).await?;
            if !value.trim().is_empty() {
                return Some(value);
            }
            println!("This argument is required. Please provide a value.");
        }
    }
}

/// Run the command loop until `quit`, end of input, or a fatal session error.
///
/// # Errors
///
/// Only errors for which [`crate::ClientError::is_fatal`] holds end the loop;
/// everything else is printed and the loop continues.
pub async fn run<R: AsyncBufRead + Unpin + Send>(
    client: &mut McpClient,
    input: &LineReader<R>,
) -> Result<()> {
    println!("\nMCP Client Started!");
    println!("{HELP_TEXT}");

    while let Some(line) = input.read_line("\nQuery: ").await {
        let command = parse_command(&line);
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(client, command, input).await {
            if e.is_fatal() {
                return Err(e);
            }
            println!("\nError: {e}");
        }
    }
    Ok(())
}

async fn execute<R: AsyncBufRead + Unpin + Send>(
    client: &mut McpClient,
    command: Command,
    input: &LineReader<R>,
) -> Result<()> {
    match command {
        Command::Empty | Command::Quit => {}
        Command::Help => println!("{HELP_TEXT}"),
        Command::Usage(usage) => println!("{usage}"),
        Command::Clear => {
            client.clear_history();
            println!("Chat history cleared!");
        }
        Command::Model(None) => println!("Current model: {}", client.model()),
        Command::Model(Some(id)) => {
            client.set_model(id);
            println!("Model set to {}", client.model());
        }
        Command::AutoResources(enabled) => {
            client.set_auto_resources(enabled);
            let state = if enabled { "enabled" } else { "disabled" };
            println!("Automatic resource inclusion {state}");
        }
        Command::Resources => {
            let resources = client.list_resources().await?;
            println!("\n{}", format_resources_list(&resources));
        }
        Command::Read(uri) => {
            let contents = client.read_resource(&uri).await?;
            println!("\n{}", format_resource_contents(&contents));
        }
        Command::Prompts => {
            let prompts = client.list_prompts().await?;
            println!("\n{}", format_prompts_list(&prompts));
        }
        Command::Prompt { name, arguments } => {
            let result = client.use_prompt(&name, &arguments, Some(input)).await?;
            println!("\nUsing prompt: {name}");
            for message in &result.messages {
                println!("\n{}: {}", message.role.as_str(), message.text());
            }
            println!("\n{}", result.turn);
        }
        Command::Query(query) => {
            let turn = client.process_query(&query).await?;
            println!("\n{turn}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("QUIT"), Command::Quit);
        assert_eq!(parse_command("clear"), Command::Clear);
        assert_eq!(parse_command("resources"), Command::Resources);
        assert_eq!(parse_command("prompts"), Command::Prompts);
        assert_eq!(parse_command("model"), Command::Model(None));
        assert_eq!(
            parse_command("model openai/gpt-4o"),
            Command::Model(Some("openai/gpt-4o".into()))
        );
    }

    #[test]
    fn test_parse_read() {
        assert_eq!(
            parse_command("read weather://alerts/CA"),
            Command::Read("weather://alerts/CA".into())
        );
        assert!(matches!(parse_command("read   "), Command::Usage(_)));
    }

    #[test]
    fn test_parse_prompt_arguments() {
        let Command::Prompt { name, arguments } = parse_command("prompt summarize topic=rust tone=short")
        else {
            panic!("expected a prompt command");
        };
        assert_eq!(name, "summarize");
        assert_eq!(arguments.get("topic").map(String::as_str), Some("rust"));
        assert_eq!(arguments.len(), 2);
        assert!(matches!(parse_command("prompt summarize rust"), Command::Usage(_)));
    }

    #[test]
    fn test_parse_auto_resources() {
        assert_eq!(parse_command("auto-resources on"), Command::AutoResources(true));
        assert_eq!(parse_command("auto-resources NO"), Command::AutoResources(false));
        assert!(matches!(parse_command("auto-resources maybe"), Command::Usage(_)));
    }

    #[test]
    fn test_everything_else_is_a_query() {
        assert_eq!(
            parse_command("What's the weather in Boston?"),
            Command::Query("What's the weather in Boston?".into())
        );
        assert_eq!(
            parse_command("clear the table for me"),
            Command::Query("clear the table for me".into())
        );
    }

    #[tokio::test]
    async fn test_prompter_skips_blank_lines() {
        let reader = LineReader::new(tokio::io::BufReader::new(&b"\n  \nrust\n"[..]));
        let prompt = PromptDescriptor {
            name: "summarize".into(),
            description: None,
            arguments: vec![],
        };
        let arg = PromptArgumentSpec {
            name: "topic".into(),
            description: None,
            required: true,
        };
        assert_eq!(reader.ask(&prompt, &arg).await.as_deref(), Some("rust"));
        assert_eq!(reader.ask(&prompt, &arg).await, None);
    }
}

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};
use url::Url;

use crate::error::{ClientError, Result};

/// Interpreter used for `.py` server scripts.
const PYTHON_COMMAND: &str = "python";
/// Interpreter used for `.js` server scripts.
const NODE_COMMAND: &str = "node";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct McpConfig {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: HashMap<String, McpServerEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum McpServerEntry {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    RemoteHttp {
        url: String,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

pub fn load_mcp_config(path: impl AsRef<Path>) -> Result<McpConfig> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path)
        .map_err(|e| ClientError::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&txt)
        .map_err(|e| ClientError::Config(format!("invalid {}: {e}", path.display())))
}

/// Where the single MCP server of a session lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTarget {
    /// Child process speaking MCP over stdio.
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// Streamable HTTP endpoint.
    Http { url: Url },
}

impl ServerTarget {
    /// Interpret a command-line server argument.
    ///
    /// `http(s)://` URLs connect over streamable HTTP; `.py` and `.js`
    /// scripts are launched with `python` and `node`.
    pub fn from_arg(arg: &str) -> Result<Self> {
        let invalid = |reason: &str| ClientError::InvalidTarget {
            target: arg.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = arg.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty server target"));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
            return Ok(Self::Http { url });
        }

        let command = if trimmed.ends_with(".py") {
            PYTHON_COMMAND
        } else if trimmed.ends_with(".js") {
            NODE_COMMAND
        } else {
            return Err(invalid("server script must be a .py or .js file, or an http(s) URL"));
        };

        Ok(Self::Stdio {
            command: command.to_string(),
            args: vec![trimmed.to_string()],
            env: HashMap::new(),
        })
    }

    /// Build a target from one entry of `mcp.json`, expanding `${VAR}` placeholders.
    pub fn from_entry(name: &str, entry: &McpServerEntry) -> Result<Self> {
        match entry {
            McpServerEntry::Stdio { command, args, env } => Ok(Self::Stdio {
                command: expand_env_placeholders(command),
                args: args.iter().map(|a| expand_env_placeholders(a)).collect(),
                env: expand_env_map(env),
            }),
            McpServerEntry::RemoteHttp { url, .. } => {
                let expanded = expand_env_placeholders(url);
                let url = Url::parse(&expanded).map_err(|e| ClientError::InvalidTarget {
                    target: name.to_string(),
                    reason: format!("invalid url: {e}"),
                })?;
                Ok(Self::Http { url })
            }
        }
    }

    /// Look up `name` in an `mcp.json` file. With no name the file must hold exactly one server.
    pub fn from_config_file(path: impl AsRef<Path>, name: Option<&str>) -> Result<Self> {
        let cfg = load_mcp_config(path)?;
        let (name, entry) = match name {
            Some(name) => cfg
                .mcp_servers
                .get_key_value(name)
                .ok_or_else(|| ClientError::Config(format!("no MCP server named '{name}'")))?,
            None => {
                let mut entries = cfg.mcp_servers.iter();
                match (entries.next(), entries.next()) {
                    (Some(only), None) => only,
                    (None, _) => {
                        return Err(ClientError::Config("mcp config lists no servers".into()));
                    }
                    (Some(_), Some(_)) => {
                        return Err(ClientError::Config(
                            "mcp config lists several servers; pick one with --server-name".into(),
                        ));
                    }
                }
            }
        };
        Self::from_entry(name, entry)
    }

    /// Short human-readable description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Stdio { command, args, .. } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{command} {}", args.join(" "))
                }
            }
            // Query strings may carry credentials.
            Self::Http { url } => format!("{}{}", url.origin().ascii_serialization(), url.path()),
        }
    }
}

/// Expand "${VAR}" placeholders from the process environment.
/// Missing variables leave the placeholder unchanged.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = input.to_string();
    for (k, v) in std::env::vars() {
        let needle = format!("${{{k}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, &v);
        }
    }
    out
}

pub fn expand_env_map(map: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.clone(), expand_env_placeholders(v)))
        .collect()
}

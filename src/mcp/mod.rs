//! Model Context Protocol (MCP) client side.
//!
//! One [`session::McpSession`] per connected server, shared by three thin
//! managers that reshape server answers for the chat loop:
//!
//! - [`tools::ToolManager`]: tool catalogue in function-calling format, tool execution
//! - [`resources::ResourceManager`]: resource reads and relevance-based auto-inclusion
//! - [`prompts::PromptManager`]: prompt templates rendered into chat messages
//!
//! # Configuration
//!
//! A server is given on the command line (`weather.py`, `server.js`,
//! `https://host/mcp`) or picked from an `mcp.json` file:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "weather": {
//!       "command": "python",
//!       "args": ["servers/weather/weather.py"]
//!     },
//!     "remote": {
//!       "url": "https://mcp.example.com/mcp?key=${EXAMPLE_KEY}"
//!     }
//!   }
//! }
//! ```

pub mod config;
pub mod prompts;
pub mod resources;
pub mod session;
pub mod tools;
pub mod types;

pub use config::ServerTarget;
pub use prompts::{ArgumentPrompter, PromptManager};
pub use resources::{RelevancePolicy, ResourceManager};
pub use session::{McpSession, RmcpSession};
pub use tools::{ToolCallResult, ToolManager};

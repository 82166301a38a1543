//! MCP server for editing the watcher's `config.yaml`.
//!
//! Speaks JSON-RPC 2.0 over newline-delimited stdio and exposes tools to
//! inspect and change the watched dates and the IFTTT webhook.
//!
//! - **types**: JSON-RPC 2.0 envelopes and MCP messages
//! - **transport**: stdio and in-memory channel transports
//! - **store**: YAML read-modify-write with backup and restore
//! - **validate**: date list and webhook URL checks
//! - **tools**: the tool catalogue and its handlers
//! - **server**: request dispatch and the serve loop
//!
//! ```no_run
//! use ticketwatch_mcp::{ConfigStore, ConfigTools, McpServer, StdioTransport};
//!
//! # async fn example() {
//! let tools = ConfigTools::new(ConfigStore::new("config.yaml"));
//! let mut server = McpServer::new(tools);
//! let mut transport = StdioTransport::new();
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```

pub mod error;
pub mod server;
pub mod store;
pub mod tools;
pub mod transport;
pub mod types;
pub mod validate;

pub use error::{McpError, StoreError};
pub use server::McpServer;
pub use store::ConfigStore;
pub use tools::ConfigTools;
pub use transport::{ChannelTransport, McpTransport, StdioTransport};

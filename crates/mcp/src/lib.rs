//! MCP (Model Context Protocol) server for the semdoc tools.
//!
//! This crate implements the server side of MCP over JSON-RPC 2.0, exposing
//! the tools of a `ToolRegistry` to MCP clients.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: Pluggable transport layer (stdio, channels)
//! - **server**: MCP server wrapping a `ToolRegistry` and its `ToolContext`
//! - **error**: Protocol error types
//!
//! # Usage
//!
//! ```no_run
//! use semdoc_mcp::server::McpServer;
//! use semdoc_mcp::transport::StdioTransport;
//! use semdoc_tool_runtime::{ToolContext, ToolRegistry};
//!
//! # async fn example(context: ToolContext) {
//! let registry = ToolRegistry::with_builtin_tools().unwrap();
//! let mut server = McpServer::new(registry, context);
//! let mut transport = StdioTransport::new();
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```

pub mod error;
pub mod server;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use server::McpServer;
pub use transport::{ChannelTransport, McpTransport, StdioTransport};
pub use types::*;

//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to talk to tool providers over SSE, a spawned
//! stdio process or streamable HTTP. The rest of the crate only sees the
//! `Connector` and `ToolProvider` traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpgate_core::mcp::{Connector, RmcpConnector, TransportConfig};
//!
//! let connector = RmcpConnector::new(logger);
//! let transport = TransportConfig::stdio("uvx", ["mcp-server-time"]);
//! let provider = connector.connect("session-1", &transport, &|_pid| {}).await?;
//!
//! let tools = provider.list_tools().await?;
//! let outcome = provider.call_tool("get_current_time", json!({
//!     "timezone": "UTC"
//! })).await?;
//! ```

mod client;
mod content;
mod error;
mod provider;
mod transport;

pub mod mock;

pub use client::{McpConnection, RmcpConnector};
pub use content::normalize_content;
pub use error::{with_timeout, McpError, McpResult};
pub use provider::{Connector, ToolOutcome, ToolProvider};
pub use transport::{TransportConfig, TransportKind};

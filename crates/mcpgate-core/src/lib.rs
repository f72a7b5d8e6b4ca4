//! McpGate Core
//!
//! Tool-provider gateway: keeps sessions to MCP servers over SSE, stdio and
//! streamable HTTP, exposes their tools as one catalog, and runs a bounded
//! tool-calling loop against an LLM completion service.
//!
//! ## Tool Orchestration
//!
//! ```rust,ignore
//! use mcpgate_core::{Gateway, GatewayConfig, TurnRequest};
//!
//! let gateway = Gateway::from_config(config, logger)?;
//! let report = gateway.startup().await;
//!
//! // Tools offered to the LLM, first session wins duplicate names
//! let tools = gateway.llm_tools();
//!
//! // One user turn, including every tool round-trip
//! let outcome = gateway.chat(TurnRequest::new("What time is it in Tokyo?")).await?;
//!
//! gateway.shutdown().await;
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod presets;
pub mod session;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    ChatMessage, ContentPart, MessageContent, MessageRole, TokenUsage, ToolCall, ToolDescriptor,
    ToolResult,
};

pub use logging::{ConsoleLogger, Logger, MemoryLogger, NoOpLogger};

pub use config::{CompletionConfig, FileConfig, GatewayConfig, PresetConfig};

pub use error::{GatewayError, GatewayResult};

pub use gateway::Gateway;

pub use session::{Session, SessionManager, SessionStatus};

pub use presets::{AutoConnectReport, Preset, PresetRegistry};

pub use tools::{AggregatedTool, ToolCatalog, ToolExecution, ToolInvoker};

pub use completion::{CompletionReply, CompletionService, GenaiCompletion, ProviderError};

pub use orchestrator::{Orchestrator, TurnOutcome, TurnRequest};

// MCP client using official rmcp SDK
pub use mcp::{Connector, McpError, McpResult, RmcpConnector, ToolOutcome, ToolProvider, TransportConfig};

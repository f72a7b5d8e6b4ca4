//! Capability seams between the session layer and the transports

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::content::normalize_content;
use super::error::McpResult;
use super::transport::TransportConfig;
use crate::types::ToolDescriptor;

/// Outcome of a completed `tools/call`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    /// Raw content blocks as returned by the provider
    pub content: Value,
    /// Normalized text rendering of `content`
    pub text: String,
    /// Whether the provider flagged its own result as an error
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn from_content(content: Value, is_error: bool) -> Self {
        let text = normalize_content(&content);
        Self {
            content,
            text,
            is_error,
        }
    }

    /// A single text block
    pub fn text(text: impl Into<String>, is_error: bool) -> Self {
        let text = text.into();
        Self {
            content: serde_json::json!([{ "type": "text", "text": text }]),
            text,
            is_error,
        }
    }
}

/// One live connection to a tool provider
///
/// Implementations must tolerate concurrent `call_tool`s; multiplexing or
/// serializing them is the transport's business.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome>;

    /// Close the underlying transport; closing twice is not an error
    async fn close(&self) -> McpResult<()>;

    /// Pid of the spawned process, for the stdio transport
    fn process_id(&self) -> Option<u32> {
        None
    }
}

/// Opens transport connections
///
/// `on_spawn` must be invoked with the child's pid as soon as a stdio
/// transport has spawned its process, whether or not the handshake that
/// follows succeeds.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        session_id: &str,
        transport: &TransportConfig,
        on_spawn: &(dyn Fn(u32) + Send + Sync),
    ) -> McpResult<Arc<dyn ToolProvider>>;
}

//! Gateway error taxonomy
//!
//! Every public operation of the session, preset, tool and orchestrator
//! layers returns `GatewayResult`. Adapters map `GatewayError::kind()` to
//! their own wire representation.

use thiserror::Error;

use crate::completion::ProviderError;
use crate::mcp::McpError;
use crate::session::SessionStatus;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Tool discovery failed for {endpoint}: {reason}")]
    DiscoveryFailed { endpoint: String, reason: String },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Tool '{name}' not found. Available tools: {}", .available.join(", "))]
    ToolNotFound { name: String, available: Vec<String> },

    #[error("Session {session_id} is not connected (status: {status})")]
    NotConnected {
        session_id: String,
        status: SessionStatus,
    },

    /// The call never produced a result
    #[error("tool '{tool}' failed: {source}")]
    ToolTransport {
        tool: String,
        session_id: String,
        #[source]
        source: McpError,
    },

    /// The provider completed the call and flagged its result as an error
    #[error("{message}")]
    ToolReported {
        tool: String,
        session_id: String,
        message: String,
        detail: serde_json::Value,
    },

    #[error("Completion service error: {0}")]
    Completion(#[from] ProviderError),
}

impl GatewayError {
    /// Stable snake_case identifier of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::DiscoveryFailed { .. } => "discovery_failed",
            Self::SessionNotFound(_) => "session_not_found",
            Self::PresetNotFound(_) => "preset_not_found",
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::NotConnected { .. } => "not_connected",
            Self::ToolTransport { .. } => "tool_transport",
            Self::ToolReported { .. } => "tool_reported",
            Self::Completion(_) => "completion",
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Text fed back to the completion service as a failed tool result
    pub fn tool_feedback(&self) -> String {
        match self {
            Self::ToolTransport { .. } | Self::ToolReported { .. } => format!("Error: {}", self),
            other => other.to_string(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_not_found_lists_available() {
        let err = GatewayError::ToolNotFound {
            name: "frobnicate".to_string(),
            available: vec!["echo".to_string(), "add".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Tool 'frobnicate' not found. Available tools: echo, add"
        );
        assert_eq!(err.kind(), "tool_not_found");
        assert_eq!(err.tool_feedback(), err.to_string());
    }

    #[test]
    fn test_tool_feedback_wording() {
        let transport = GatewayError::ToolTransport {
            tool: "fetch".to_string(),
            session_id: "s1".to_string(),
            source: McpError::ToolCallFailed("connection reset".to_string()),
        };
        assert_eq!(
            transport.tool_feedback(),
            "Error: tool 'fetch' failed: Tool call failed: connection reset"
        );

        let reported = GatewayError::ToolReported {
            tool: "fetch".to_string(),
            session_id: "s1".to_string(),
            message: "404 Not Found".to_string(),
            detail: json!([{ "type": "text", "text": "404 Not Found" }]),
        };
        assert_eq!(reported.tool_feedback(), "Error: 404 Not Found");
        assert_eq!(reported.kind(), "tool_reported");
    }

    #[test]
    fn test_completion_errors_convert() {
        let err: GatewayError = ProviderError::missing_api_key("openai").into();
        assert_eq!(err.kind(), "completion");
        assert!(matches!(err, GatewayError::Completion(ref e) if e.is_credentials()));
    }
}

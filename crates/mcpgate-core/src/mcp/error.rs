//! Transport and protocol level errors

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a transport connection or the protocol library beneath it
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

/// Run `future` with a deadline, reporting expiry as a transport failure
pub async fn with_timeout<T, F>(operation: &str, after: Duration, future: F) -> McpResult<T>
where
    F: std::future::Future<Output = McpResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => Err(McpError::timeout(operation, after)),
    }
}

//! Session snapshot types

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mcp::{TransportConfig, TransportKind};
use crate::types::ToolDescriptor;

/// Lifecycle state of a session
///
/// `Connecting` moves to `Connected` once discovery succeeds, or to `Error`
/// (after which the row is removed). `Connected` moves to `Disconnected`
/// on close. Nothing leaves `Disconnected` or `Error` except removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time view of one session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Endpoint description, never including credentials
    pub endpoint: String,
    #[serde(skip)]
    pub transport: TransportConfig,
    pub transport_kind: TransportKind,
    pub status: SessionStatus,
    pub tools: Vec<ToolDescriptor>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Registry insertion order, breaks `created_at` ties
    #[serde(skip)]
    pub sequence: u64,
}

impl Session {
    pub(crate) fn connecting(id: String, transport: TransportConfig, sequence: u64) -> Self {
        Self {
            id,
            endpoint: transport.describe(),
            transport_kind: transport.kind(),
            transport,
            status: SessionStatus::Connecting,
            tools: Vec::new(),
            created_at: Utc::now(),
            process_id: None,
            sequence,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Sort key for "session order"
    ///
    /// `created_at` is stamped when `open` starts, so a session that began
    /// connecting earlier sorts first even if its handshake finished later.
    pub(crate) fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }
}

//! Concurrent session table
//!
//! Every method takes the lock for a single map operation and releases it
//! before returning; callers never hold it across I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::model::{Session, SessionStatus};
use crate::mcp::{ToolProvider, TransportConfig};
use crate::types::ToolDescriptor;

struct SessionEntry {
    session: Session,
    provider: Option<Arc<dyn ToolProvider>>,
}

#[derive(Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<String, SessionEntry>>,
    next_sequence: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a `Connecting` row; returns `None` if the id is taken
    pub fn insert_connecting(&self, id: &str, transport: TransportConfig) -> Option<Session> {
        let mut entries = self.entries.write();
        if entries.contains_key(id) {
            return None;
        }
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let session = Session::connecting(id.to_string(), transport, sequence);
        entries.insert(
            id.to_string(),
            SessionEntry {
                session: session.clone(),
                provider: None,
            },
        );
        Some(session)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.entries.read().get(id).map(|e| e.session.clone())
    }

    /// Provider of a `Connected` session
    pub fn provider(&self, id: &str) -> Option<Arc<dyn ToolProvider>> {
        self.entries
            .read()
            .get(id)
            .filter(|e| e.session.is_connected())
            .and_then(|e| e.provider.clone())
    }

    pub fn attach(&self, id: &str, provider: Arc<dyn ToolProvider>) -> bool {
        match self.entries.write().get_mut(id) {
            Some(entry) => {
                entry.provider = Some(provider);
                true
            }
            None => false,
        }
    }

    pub fn set_process_id(&self, id: &str, pid: u32) {
        if let Some(entry) = self.entries.write().get_mut(id) {
            entry.session.process_id.get_or_insert(pid);
        }
    }

    /// Move a `Connecting` session to `Connected` with its discovered tools
    pub fn mark_connected(&self, id: &str, tools: Vec<ToolDescriptor>) -> Option<Session> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(id)?;
        if entry.session.status != SessionStatus::Connecting {
            return None;
        }
        entry.session.status = SessionStatus::Connected;
        entry.session.tools = tools;
        Some(entry.session.clone())
    }

    /// Swap the tool list of a `Connected` session wholesale
    pub fn replace_tools(&self, id: &str, tools: Vec<ToolDescriptor>) -> Option<Session> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(id).filter(|e| e.session.is_connected())?;
        entry.session.tools = tools;
        Some(entry.session.clone())
    }

    pub fn set_status(&self, id: &str, status: SessionStatus) -> Option<SessionStatus> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(id)?;
        Some(std::mem::replace(&mut entry.session.status, status))
    }

    /// Remove a row, handing back its provider for closing
    pub fn remove(&self, id: &str) -> Option<(Session, Option<Arc<dyn ToolProvider>>)> {
        self.entries
            .write()
            .remove(id)
            .map(|e| (e.session, e.provider))
    }

    /// All sessions in session order
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .entries
            .read()
            .values()
            .map(|e| e.session.clone())
            .collect();
        sessions.sort_by_key(Session::order_key);
        sessions
    }

    /// `Connected` sessions in session order
    pub fn connected(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .entries
            .read()
            .values()
            .filter(|e| e.session.is_connected())
            .map(|e| e.session.clone())
            .collect();
        sessions.sort_by_key(Session::order_key);
        sessions
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }
}

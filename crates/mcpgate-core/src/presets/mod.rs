//! Named, preconfigured tool providers
//!
//! A preset remembers the session it last opened. `connect` reuses that
//! session while it is still connected, so repeated connects cost a single
//! handshake.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::PresetConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::logging::Logger;
use crate::mcp::TransportConfig;
use crate::session::SessionManager;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub transport: TransportConfig,
    pub auto_connect: bool,
    pub tags: Vec<String>,
    /// Session opened by the last successful connect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl From<PresetConfig> for Preset {
    fn from(config: PresetConfig) -> Self {
        let name = if config.name.is_empty() {
            config.id.clone()
        } else {
            config.name
        };
        Self {
            id: config.id,
            name,
            description: config.description,
            transport: config.transport,
            auto_connect: config.auto_connect,
            tags: config.tags,
            session_id: None,
        }
    }
}

/// Result of `PresetRegistry::connect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetConnection {
    pub session_id: String,
    pub tool_count: usize,
    /// The existing session was returned without a new handshake
    pub reused: bool,
}

/// Partition produced by `auto_connect_all`
#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoConnectReport {
    /// Preset ids that are now connected, in preset order
    pub connected: Vec<String>,
    /// Preset ids that failed, in preset order
    pub failed: Vec<String>,
    /// One `(preset id, error message)` per failure
    pub errors: Vec<(String, String)>,
}

struct PresetEntry {
    preset: Preset,
    /// Serializes connect/disconnect of this preset
    connect_lock: Arc<tokio::sync::Mutex<()>>,
}

pub struct PresetRegistry {
    entries: RwLock<Vec<PresetEntry>>,
    sessions: Arc<SessionManager>,
    logger: Arc<dyn Logger>,
}

impl PresetRegistry {
    pub fn new(sessions: Arc<SessionManager>, logger: Arc<dyn Logger>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            sessions,
            logger,
        }
    }

    /// Build from configuration, rejecting invalid or duplicate presets
    pub fn from_configs(
        configs: impl IntoIterator<Item = PresetConfig>,
        sessions: Arc<SessionManager>,
        logger: Arc<dyn Logger>,
    ) -> GatewayResult<Self> {
        let registry = Self::new(sessions, logger);
        for config in configs {
            registry.add(config.into())?;
        }
        Ok(registry)
    }

    /// All presets in registration order
    pub fn list(&self) -> Vec<Preset> {
        let presets: Vec<Preset> = self.entries.read().iter().map(|e| e.preset.clone()).collect();
        presets.into_iter().map(|p| self.with_live_session(p)).collect()
    }

    pub fn get(&self, id: &str) -> Option<Preset> {
        self.stored(id).map(|p| self.with_live_session(p))
    }

    fn stored(&self, id: &str) -> Option<Preset> {
        self.entries
            .read()
            .iter()
            .find(|e| e.preset.id == id)
            .map(|e| e.preset.clone())
    }

    /// A session closed behind the registry's back is reported as no session
    fn with_live_session(&self, mut preset: Preset) -> Preset {
        let live = preset
            .session_id
            .as_deref()
            .map_or(false, |id| self.sessions.get_connected(id).is_some());
        if !live {
            preset.session_id = None;
        }
        preset
    }

    /// Register a preset at runtime
    pub fn add(&self, mut preset: Preset) -> GatewayResult<()> {
        if preset.id.trim().is_empty() {
            return Err(GatewayError::invalid_input("preset id must not be empty"));
        }
        preset
            .transport
            .validate()
            .map_err(|reason| GatewayError::invalid_input(format!("preset '{}': {}", preset.id, reason)))?;

        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.preset.id == preset.id) {
            return Err(GatewayError::invalid_input(format!(
                "preset '{}' already exists",
                preset.id
            )));
        }
        preset.session_id = None;
        entries.push(PresetEntry {
            preset,
            connect_lock: Arc::new(tokio::sync::Mutex::new(())),
        });
        Ok(())
    }

    /// Unregister a preset, disconnecting its session first
    pub async fn remove(&self, id: &str) -> GatewayResult<Preset> {
        self.disconnect(id).await?;
        let mut entries = self.entries.write();
        let position = entries
            .iter()
            .position(|e| e.preset.id == id)
            .ok_or_else(|| GatewayError::PresetNotFound(id.to_string()))?;
        Ok(entries.remove(position).preset)
    }

    fn entry_parts(&self, id: &str) -> GatewayResult<(Preset, Arc<tokio::sync::Mutex<()>>)> {
        self.entries
            .read()
            .iter()
            .find(|e| e.preset.id == id)
            .map(|e| (e.preset.clone(), e.connect_lock.clone()))
            .ok_or_else(|| GatewayError::PresetNotFound(id.to_string()))
    }

    fn set_session_id(&self, id: &str, session_id: Option<String>) {
        if let Some(entry) = self.entries.write().iter_mut().find(|e| e.preset.id == id) {
            entry.preset.session_id = session_id;
        }
    }

    /// Connect a preset, reusing its session while that is still connected
    pub async fn connect(&self, id: &str) -> GatewayResult<PresetConnection> {
        let (preset, lock) = self.entry_parts(id)?;
        let _guard = lock.lock().await;

        // Re-read under the lock: a concurrent connect may have finished
        let preset = self.stored(id).unwrap_or(preset);

        if let Some(session_id) = &preset.session_id {
            if let Some(session) = self.sessions.get_connected(session_id) {
                self.logger.debug(&format!(
                    "[PresetRegistry] Reusing session {} for preset {}",
                    session_id, id
                ));
                return Ok(PresetConnection {
                    session_id: session.id,
                    tool_count: session.tools.len(),
                    reused: true,
                });
            }
            self.logger.debug(&format!(
                "[PresetRegistry] Clearing stale session {} of preset {}",
                session_id, id
            ));
            self.set_session_id(id, None);
        }

        let session = self.sessions.open(preset.transport.clone()).await?;
        self.set_session_id(id, Some(session.id.clone()));

        self.logger.info(&format!(
            "[PresetRegistry] Preset {} connected as session {} ({} tools)",
            id,
            session.id,
            session.tools.len()
        ));

        Ok(PresetConnection {
            session_id: session.id,
            tool_count: session.tools.len(),
            reused: false,
        })
    }

    /// Close the preset's session if it has one
    pub async fn disconnect(&self, id: &str) -> GatewayResult<()> {
        let (preset, lock) = self.entry_parts(id)?;
        let _guard = lock.lock().await;

        let session_id = self.stored(id).unwrap_or(preset).session_id;
        if let Some(session_id) = session_id {
            self.sessions.close(&session_id).await;
            self.set_session_id(id, None);
            self.logger
                .info(&format!("[PresetRegistry] Preset {} disconnected", id));
        }
        Ok(())
    }

    /// Connect every auto-connect preset concurrently
    ///
    /// One failing preset never prevents the others from connecting.
    pub async fn auto_connect_all(&self) -> AutoConnectReport {
        let ids: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.preset.auto_connect)
            .map(|e| e.preset.id.clone())
            .collect();

        let results = join_all(ids.iter().map(|id| self.connect(id))).await;

        let mut report = AutoConnectReport::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(_) => report.connected.push(id),
                Err(e) => {
                    self.logger.warn(&format!(
                        "[PresetRegistry] Auto-connect of {} failed: {}",
                        id, e
                    ));
                    report.errors.push((id.clone(), e.to_string()));
                    report.failed.push(id);
                }
            }
        }

        self.logger.info(&format!(
            "[PresetRegistry] Auto-connect: {} connected, {} failed",
            report.connected.len(),
            report.failed.len()
        ));
        report
    }
}

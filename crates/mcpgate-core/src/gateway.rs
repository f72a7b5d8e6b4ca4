//! Gateway facade
//!
//! Owns the registries and wires them to a connector, a completion service
//! and a logger. Adapters (HTTP, desktop IPC, ...) talk to this type only.

use std::sync::Arc;

use serde_json::Value;

use crate::completion::{CompletionService, GenaiCompletion};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::logging::Logger;
use crate::mcp::{Connector, RmcpConnector, ToolOutcome, TransportConfig};
use crate::orchestrator::{Orchestrator, TurnOutcome, TurnRequest};
use crate::presets::{AutoConnectReport, Preset, PresetConnection, PresetRegistry};
use crate::session::{Session, SessionManager, SessionTimeouts};
use crate::tools::{AggregatedTool, ToolCatalog, ToolInvoker};
use crate::types::ToolDescriptor;

pub struct Gateway {
    sessions: Arc<SessionManager>,
    presets: PresetRegistry,
    invoker: Arc<ToolInvoker>,
    orchestrator: Orchestrator,
    logger: Arc<dyn Logger>,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        connector: Arc<dyn Connector>,
        completion: Arc<dyn CompletionService>,
        logger: Arc<dyn Logger>,
    ) -> GatewayResult<Self> {
        config
            .validate()
            .map_err(|e| GatewayError::invalid_input(e.to_string()))?;

        let timeouts = SessionTimeouts {
            connect: config.connect_timeout(),
            call: config.call_timeout(),
        };
        let sessions = Arc::new(SessionManager::with_timeouts(connector, timeouts, logger.clone()));
        let presets = PresetRegistry::from_configs(config.presets.clone(), sessions.clone(), logger.clone())?;
        let invoker = Arc::new(ToolInvoker::new(sessions.clone(), logger.clone()));
        let orchestrator = Orchestrator::new(invoker.clone(), completion, logger.clone())
            .with_max_iterations(config.max_iterations)
            .with_completion_timeout(config.completion_timeout());

        Ok(Self {
            sessions,
            presets,
            invoker,
            orchestrator,
            logger,
        })
    }

    /// Production wiring: rmcp transports and a genai completion service
    pub fn from_config(config: GatewayConfig, logger: Arc<dyn Logger>) -> GatewayResult<Self> {
        let connector = Arc::new(RmcpConnector::new(logger.clone()));
        let completion = Arc::new(GenaiCompletion::new(config.completion.clone(), logger.clone()));
        Self::new(config, connector, completion, logger)
    }

    /// Connect every auto-connect preset
    pub async fn startup(&self) -> AutoConnectReport {
        self.logger.info("[Gateway] Starting up");
        self.presets.auto_connect_all().await
    }

    /// Close every session
    pub async fn shutdown(&self) {
        let closed = self.sessions.close_all().await;
        self.logger
            .info(&format!("[Gateway] Shut down, closed {} session(s)", closed));
    }

    // Sessions

    pub async fn open_session(&self, transport: TransportConfig) -> GatewayResult<Session> {
        self.sessions.open(transport).await
    }

    pub async fn close_session(&self, session_id: &str) -> bool {
        self.sessions.close(session_id).await
    }

    pub async fn refresh_tools(&self, session_id: &str) -> GatewayResult<Session> {
        self.sessions.refresh_tools(session_id).await
    }

    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id)
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.list()
    }

    // Presets

    pub fn presets(&self) -> Vec<Preset> {
        self.presets.list()
    }

    pub fn preset_registry(&self) -> &PresetRegistry {
        &self.presets
    }

    pub async fn connect_preset(&self, preset_id: &str) -> GatewayResult<PresetConnection> {
        self.presets.connect(preset_id).await
    }

    pub async fn disconnect_preset(&self, preset_id: &str) -> GatewayResult<()> {
        self.presets.disconnect(preset_id).await
    }

    // Tools

    pub fn catalog(&self) -> &ToolCatalog {
        self.invoker.catalog()
    }

    pub fn tools(&self) -> Vec<AggregatedTool> {
        self.catalog().aggregate()
    }

    pub fn llm_tools(&self) -> Vec<ToolDescriptor> {
        self.catalog().llm_tools()
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> GatewayResult<ToolOutcome> {
        self.invoker.invoke(name, arguments).await
    }

    pub async fn invoke_on(
        &self,
        session_id: &str,
        name: &str,
        arguments: Value,
    ) -> GatewayResult<ToolOutcome> {
        self.invoker.invoke_on(session_id, name, arguments).await
    }

    // Conversation

    pub async fn chat(&self, request: TurnRequest) -> GatewayResult<TurnOutcome> {
        self.orchestrator.run(request).await
    }
}

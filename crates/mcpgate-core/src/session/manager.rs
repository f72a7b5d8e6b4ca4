//! Session lifecycle: open, discover, invoke, close

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;

use super::model::{Session, SessionStatus};
use super::registry::SessionRegistry;
use crate::error::{GatewayError, GatewayResult};
use crate::mcp::{with_timeout, Connector, ToolOutcome, ToolProvider, TransportConfig};
use crate::logging::Logger;
use crate::types::ToolDescriptor;

/// Deadlines for the external calls a session makes
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub connect: Duration,
    /// Applies to discovery and to each tool call
    pub call: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            call: Duration::from_secs(60),
        }
    }
}

/// Owns every session's transport connection
pub struct SessionManager {
    registry: Arc<SessionRegistry>,
    connector: Arc<dyn Connector>,
    timeouts: SessionTimeouts,
    logger: Arc<dyn Logger>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, logger: Arc<dyn Logger>) -> Self {
        Self::with_timeouts(connector, SessionTimeouts::default(), logger)
    }

    pub fn with_timeouts(
        connector: Arc<dyn Connector>,
        timeouts: SessionTimeouts,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            connector,
            timeouts,
            logger,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Connect, handshake and discover tools
    ///
    /// The session is visible as `Connecting` while this runs. On any
    /// failure the row is removed again and the connection closed, so a
    /// failed open leaves nothing behind.
    pub async fn open(&self, transport: TransportConfig) -> GatewayResult<Session> {
        transport.validate().map_err(GatewayError::InvalidInput)?;

        let id = uuid::Uuid::new_v4().to_string();
        let endpoint = transport.describe();
        self.registry
            .insert_connecting(&id, transport.clone())
            .ok_or_else(|| GatewayError::invalid_input(format!("session id {} already in use", id)))?;

        self.logger.info(&format!(
            "[SessionManager] Opening session {} ({}): {}",
            id,
            transport.kind(),
            endpoint
        ));

        let registry = self.registry.clone();
        let spawned_id = id.clone();
        let on_spawn = move |pid: u32| registry.set_process_id(&spawned_id, pid);

        let connected = with_timeout(
            "handshake",
            self.timeouts.connect,
            self.connector.connect(&id, &transport, &on_spawn),
        )
        .await;

        let provider = match connected {
            Ok(provider) => provider,
            Err(e) => {
                self.discard(&id, None).await;
                self.logger.warn(&format!(
                    "[SessionManager] Connection to {} failed: {}",
                    endpoint, e
                ));
                return Err(GatewayError::ConnectionFailed {
                    endpoint,
                    reason: e.to_string(),
                });
            }
        };

        if let Some(pid) = provider.process_id() {
            self.registry.set_process_id(&id, pid);
        }
        self.registry.attach(&id, provider.clone());

        let tools = match with_timeout("tool discovery", self.timeouts.call, provider.list_tools()).await {
            Ok(tools) => tools,
            Err(e) => {
                self.discard(&id, Some(provider)).await;
                self.logger.warn(&format!(
                    "[SessionManager] Tool discovery on {} failed: {}",
                    endpoint, e
                ));
                return Err(GatewayError::DiscoveryFailed {
                    endpoint,
                    reason: e.to_string(),
                });
            }
        };

        match self.registry.mark_connected(&id, tools) {
            Some(session) => {
                self.logger.info(&format!(
                    "[SessionManager] Session {} connected with {} tools",
                    id,
                    session.tools.len()
                ));
                Ok(session)
            }
            None => {
                // Closed while the handshake was in flight
                self.discard(&id, Some(provider)).await;
                Err(GatewayError::ConnectionFailed {
                    endpoint,
                    reason: "session was closed during the handshake".to_string(),
                })
            }
        }
    }

    /// Mark a failed session, drop its row and close whatever was opened
    async fn discard(&self, id: &str, provider: Option<Arc<dyn ToolProvider>>) {
        self.registry.set_status(id, SessionStatus::Error);
        let attached = self.registry.remove(id).and_then(|(_, p)| p);
        if let Some(provider) = provider.or(attached) {
            self.close_provider(id, provider).await;
        }
    }

    async fn close_provider(&self, id: &str, provider: Arc<dyn ToolProvider>) {
        if let Err(e) = provider.close().await {
            self.logger.warn(&format!(
                "[SessionManager] Closing transport of session {} failed: {}",
                id, e
            ));
        }
    }

    fn connected_provider(&self, id: &str) -> GatewayResult<(Session, Arc<dyn ToolProvider>)> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))?;
        let provider = self
            .registry
            .provider(id)
            .ok_or_else(|| GatewayError::NotConnected {
                session_id: id.to_string(),
                status: session.status,
            })?;
        Ok((session, provider))
    }

    /// Re-run `tools/list` and replace the cached tool list wholesale
    pub async fn discover_tools(&self, id: &str) -> GatewayResult<Vec<ToolDescriptor>> {
        let (session, provider) = self.connected_provider(id)?;

        let tools = with_timeout("tool discovery", self.timeouts.call, provider.list_tools())
            .await
            .map_err(|e| GatewayError::DiscoveryFailed {
                endpoint: session.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let updated = self
            .registry
            .replace_tools(id, tools)
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))?;

        self.logger.debug(&format!(
            "[SessionManager] Session {} now exposes {} tools",
            id,
            updated.tools.len()
        ));
        Ok(updated.tools)
    }

    /// Rediscover tools and return the updated session
    pub async fn refresh_tools(&self, id: &str) -> GatewayResult<Session> {
        self.discover_tools(id).await?;
        self.registry
            .get(id)
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))
    }

    /// Call a tool on one specific session
    pub async fn invoke(&self, id: &str, name: &str, arguments: Value) -> GatewayResult<ToolOutcome> {
        let (session, provider) = self.connected_provider(id)?;

        let descriptor = session.tool(name).ok_or_else(|| GatewayError::ToolNotFound {
            name: name.to_string(),
            available: session.tool_names(),
        })?;
        let arguments = descriptor
            .validate_arguments(&arguments)
            .map_err(GatewayError::InvalidInput)?;

        self.logger
            .debug(&format!("[SessionManager] Invoking {} on session {}", name, id));

        let operation = format!("tool call '{}'", name);
        let outcome = with_timeout(&operation, self.timeouts.call, provider.call_tool(name, arguments))
            .await
            .map_err(|source| GatewayError::ToolTransport {
                tool: name.to_string(),
                session_id: id.to_string(),
                source,
            })?;

        if outcome.is_error {
            return Err(GatewayError::ToolReported {
                tool: name.to_string(),
                session_id: id.to_string(),
                message: outcome.text,
                detail: outcome.content,
            });
        }
        Ok(outcome)
    }

    /// Close a session; unknown or already closed sessions are a no-op
    ///
    /// Returns whether a session was removed.
    pub async fn close(&self, id: &str) -> bool {
        self.registry.set_status(id, SessionStatus::Disconnected);
        let Some((session, provider)) = self.registry.remove(id) else {
            return false;
        };

        self.logger.info(&format!(
            "[SessionManager] Closed session {} ({})",
            id, session.endpoint
        ));
        if let Some(provider) = provider {
            self.close_provider(id, provider).await;
        }
        true
    }

    /// Close every session concurrently
    pub async fn close_all(&self) -> usize {
        let ids = self.registry.ids();
        let closed = join_all(ids.iter().map(|id| self.close(id))).await;
        closed.into_iter().filter(|c| *c).count()
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.registry.get(id)
    }

    /// The session, only if it is `Connected`
    pub fn get_connected(&self, id: &str) -> Option<Session> {
        self.registry.get(id).filter(Session::is_connected)
    }

    pub fn list(&self) -> Vec<Session> {
        self.registry.list()
    }

    pub fn count(&self) -> usize {
        self.registry.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::mcp::mock::{MockBehavior, MockConnector, MockServer, MockTool};
    use crate::mcp::TransportKind;
    use serde_json::json;
    use tokio::sync::Notify;

    const ECHO_URL: &str = "http://localhost:7001/sse";

    fn manager_with(connector: Arc<MockConnector>) -> SessionManager {
        SessionManager::new(connector, Arc::new(NoOpLogger))
    }

    fn echo_connector() -> Arc<MockConnector> {
        let connector = Arc::new(MockConnector::new());
        connector.register(
            ECHO_URL,
            MockServer::with_tools(vec![MockTool::echo(), MockTool::add()]),
        );
        connector
    }

    #[tokio::test]
    async fn test_open_discovers_tools() {
        let manager = manager_with(echo_connector());

        let session = manager.open(TransportConfig::sse(ECHO_URL)).await.unwrap();
        assert_eq!(session.status, SessionStatus::Connected);
        assert_eq!(session.transport_kind, TransportKind::Sse);
        assert_eq!(session.tool_names(), vec!["echo", "add"]);
        assert_eq!(manager.count(), 1);
        assert!(manager.get_connected(&session.id).is_some());
    }

    #[tokio::test]
    async fn test_invalid_descriptor_rejected_without_io() {
        let connector = echo_connector();
        let manager = manager_with(connector.clone());

        let err = manager.open(TransportConfig::sse("not a url")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(manager.count(), 0);
        assert_eq!(connector.handshakes(ECHO_URL), 0);
    }

    #[tokio::test]
    async fn test_failed_connects_leave_no_rows() {
        let connector = echo_connector();
        connector.register("http://broken:1/sse", MockServer::unreachable());
        connector.register(
            "http://nolist:1/sse",
            MockServer {
                fail_discovery: true,
                ..Default::default()
            },
        );
        let manager = manager_with(connector.clone());

        let refused = manager.open(TransportConfig::sse("http://nowhere:1/sse")).await;
        assert!(matches!(refused, Err(GatewayError::ConnectionFailed { .. })));

        let rejected = manager.open(TransportConfig::sse("http://broken:1/sse")).await;
        assert!(matches!(rejected, Err(GatewayError::ConnectionFailed { .. })));

        let undiscovered = manager.open(TransportConfig::sse("http://nolist:1/sse")).await;
        assert!(matches!(undiscovered, Err(GatewayError::DiscoveryFailed { .. })));
        assert_eq!(connector.closes("http://nolist:1/sse"), 1);

        assert_eq!(manager.count(), 0);
        assert!(manager.list().is_empty());
    }

    #[tokio::test]
    async fn test_connecting_session_is_visible_but_not_ready() {
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(MockConnector::new());
        connector.register(
            ECHO_URL,
            MockServer {
                tools: vec![MockTool::echo()],
                gate: Some(gate.clone()),
                ..Default::default()
            },
        );
        let manager = Arc::new(manager_with(connector));

        let opening = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.open(TransportConfig::sse(ECHO_URL)).await })
        };

        while manager.count() == 0 {
            tokio::task::yield_now().await;
        }
        let pending = manager.list().remove(0);
        assert_eq!(pending.status, SessionStatus::Connecting);
        assert!(manager.get_connected(&pending.id).is_none());
        assert!(manager.registry().connected().is_empty());
        assert!(matches!(
            manager.invoke(&pending.id, "echo", json!({"message": "hi"})).await,
            Err(GatewayError::NotConnected { status: SessionStatus::Connecting, .. })
        ));

        gate.notify_one();
        let session = opening.await.unwrap().unwrap();
        assert_eq!(session.id, pending.id);
        assert!(manager.get_connected(&session.id).is_some());
    }

    #[tokio::test]
    async fn test_stdio_records_pid_even_when_handshake_fails() {
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(MockConnector::new());
        connector.register(
            "flaky-server",
            MockServer {
                fail_handshake: true,
                pid: Some(4242),
                gate: Some(gate.clone()),
                ..Default::default()
            },
        );
        connector.register(
            "good-server",
            MockServer {
                tools: vec![MockTool::echo()],
                pid: Some(5151),
                ..Default::default()
            },
        );
        let manager = Arc::new(manager_with(connector));

        let opening = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .open(TransportConfig::stdio("flaky-server", Vec::<String>::new()))
                    .await
            })
        };
        while manager.list().first().and_then(|s| s.process_id).is_none() {
            tokio::task::yield_now().await;
        }
        assert_eq!(manager.list()[0].status, SessionStatus::Connecting);
        gate.notify_one();
        assert!(opening.await.unwrap().is_err());
        assert_eq!(manager.count(), 0);

        let session = manager
            .open(TransportConfig::stdio("good-server", ["--stdio"]))
            .await
            .unwrap();
        assert_eq!(session.process_id, Some(5151));
        assert_eq!(session.transport_kind, TransportKind::Stdio);
    }

    #[tokio::test]
    async fn test_invoke_checks() {
        let connector = echo_connector();
        connector.register(
            "http://flaky:1/sse",
            MockServer::with_tools(vec![
                MockTool::failing("fetch", MockBehavior::ProviderError("404 Not Found".to_string())),
                MockTool::failing("crash", MockBehavior::TransportError("connection reset".to_string())),
            ]),
        );
        let manager = manager_with(connector.clone());
        let echo = manager.open(TransportConfig::sse(ECHO_URL)).await.unwrap();
        let flaky = manager.open(TransportConfig::sse("http://flaky:1/sse")).await.unwrap();

        let outcome = manager.invoke(&echo.id, "echo", json!({"message": "hi"})).await.unwrap();
        assert_eq!(outcome.text, "hi");
        assert!(!outcome.is_error);

        let missing = manager.invoke("no-such-session", "echo", json!({})).await.unwrap_err();
        assert_eq!(missing.kind(), "session_not_found");

        let unknown = manager.invoke(&echo.id, "frobnicate", json!({})).await.unwrap_err();
        assert_eq!(
            unknown.to_string(),
            "Tool 'frobnicate' not found. Available tools: echo, add"
        );

        let invalid = manager.invoke(&echo.id, "add", json!({"a": 1})).await.unwrap_err();
        assert_eq!(invalid.kind(), "invalid_input");
        assert!(connector.calls(ECHO_URL).iter().all(|(name, _)| name != "add"));

        let reported = manager.invoke(&flaky.id, "fetch", json!({})).await.unwrap_err();
        assert!(matches!(reported, GatewayError::ToolReported { ref message, .. } if message == "404 Not Found"));

        let transport = manager.invoke(&flaky.id, "crash", Value::Null).await.unwrap_err();
        assert!(matches!(transport, GatewayError::ToolTransport { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_tolerates_close_failures() {
        let memory = Arc::new(MemoryLogger::new());
        let connector = Arc::new(MockConnector::new());
        connector.register(
            ECHO_URL,
            MockServer {
                tools: vec![MockTool::echo()],
                fail_close: true,
                ..Default::default()
            },
        );
        let manager = SessionManager::new(connector.clone(), memory.clone());
        let session = manager.open(TransportConfig::sse(ECHO_URL)).await.unwrap();

        assert!(manager.close(&session.id).await);
        assert!(!manager.close(&session.id).await);
        assert!(!manager.close("never-existed").await);

        assert_eq!(manager.count(), 0);
        assert_eq!(connector.closes(ECHO_URL), 1);
        assert!(memory.contains(LogLevel::Warn, "Closing transport"));
        assert!(matches!(
            manager.invoke(&session.id, "echo", json!({"message": "x"})).await,
            Err(GatewayError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_tools_and_close_all() {
        let connector = echo_connector();
        let manager = manager_with(connector);

        let first = manager.open(TransportConfig::sse(ECHO_URL)).await.unwrap();
        let second = manager.open(TransportConfig::sse(ECHO_URL)).await.unwrap();
        assert_ne!(first.id, second.id);

        let refreshed = manager.refresh_tools(&first.id).await.unwrap();
        assert_eq!(refreshed.tools.len(), 2);
        assert!(manager.refresh_tools("gone").await.is_err());

        assert_eq!(manager.close_all().await, 2);
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_is_a_connection_failure() {
        let connector = Arc::new(MockConnector::new());
        connector.register(
            ECHO_URL,
            MockServer {
                gate: Some(Arc::new(Notify::new())),
                ..Default::default()
            },
        );
        let manager = SessionManager::with_timeouts(
            connector,
            SessionTimeouts {
                connect: Duration::from_secs(5),
                call: Duration::from_secs(5),
            },
            Arc::new(NoOpLogger),
        );

        let err = manager.open(TransportConfig::sse(ECHO_URL)).await.unwrap_err();
        match err {
            GatewayError::ConnectionFailed { reason, .. } => {
                assert_eq!(reason, "handshake timed out after 5s")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(manager.count(), 0);
    }
}

//! In-process tool providers for tests
//!
//! `MockConnector` resolves a transport to a scripted `MockServer` keyed by
//! its URL (SSE, streamable HTTP) or command (stdio). Unknown endpoints fail
//! to connect, which stands in for an unreachable server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::error::{McpError, McpResult};
use super::provider::{Connector, ToolOutcome, ToolProvider};
use super::transport::TransportConfig;
use crate::types::ToolDescriptor;

/// What a mock tool does when called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the `message` argument
    Echo,
    /// Return the sum of the numeric `a` and `b` arguments
    Add,
    /// Always return this text
    Fixed(String),
    /// Complete the call but flag the result as an error
    ProviderError(String),
    /// Fail the call at the transport level
    TransportError(String),
}

#[derive(Debug, Clone)]
pub struct MockTool {
    pub descriptor: ToolDescriptor,
    pub behavior: MockBehavior,
}

impl MockTool {
    pub fn new(descriptor: ToolDescriptor, behavior: MockBehavior) -> Self {
        Self {
            descriptor,
            behavior,
        }
    }

    pub fn echo() -> Self {
        Self::new(
            ToolDescriptor::new("echo", "Echo a message back").with_schema(json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            })),
            MockBehavior::Echo,
        )
    }

    pub fn add() -> Self {
        Self::new(
            ToolDescriptor::new("add", "Add two numbers").with_schema(json!({
                "type": "object",
                "properties": {
                    "a": { "type": "number" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            })),
            MockBehavior::Add,
        )
    }

    pub fn fixed(name: &str, text: &str) -> Self {
        Self::new(ToolDescriptor::new(name, ""), MockBehavior::Fixed(text.to_string()))
    }

    pub fn failing(name: &str, behavior: MockBehavior) -> Self {
        Self::new(ToolDescriptor::new(name, ""), behavior)
    }
}

/// A scripted tool provider
#[derive(Clone, Default)]
pub struct MockServer {
    pub tools: Vec<MockTool>,
    pub fail_handshake: bool,
    pub fail_discovery: bool,
    pub fail_close: bool,
    /// Reported as the spawned pid for stdio transports
    pub pid: Option<u32>,
    /// When set, the handshake waits until notified
    pub gate: Option<Arc<Notify>>,
}

impl MockServer {
    pub fn with_tools(tools: Vec<MockTool>) -> Self {
        Self {
            tools,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail_handshake: true,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Endpoint {
    server: MockServer,
    handshakes: AtomicUsize,
    calls: Mutex<Vec<(String, Value)>>,
    closes: AtomicUsize,
}

/// Connector that serves `MockServer`s instead of opening real transports
#[derive(Default)]
pub struct MockConnector {
    endpoints: Mutex<HashMap<String, Arc<Endpoint>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server reachable at `key` (a URL or a stdio command)
    pub fn register(&self, key: impl Into<String>, server: MockServer) {
        self.endpoints.lock().insert(
            key.into(),
            Arc::new(Endpoint {
                server,
                ..Default::default()
            }),
        );
    }

    pub fn handshakes(&self, key: &str) -> usize {
        self.endpoint(key)
            .map(|e| e.handshakes.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn closes(&self, key: &str) -> usize {
        self.endpoint(key)
            .map(|e| e.closes.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Calls received by the server at `key`, in arrival order
    pub fn calls(&self, key: &str) -> Vec<(String, Value)> {
        self.endpoint(key)
            .map(|e| e.calls.lock().clone())
            .unwrap_or_default()
    }

    fn endpoint(&self, key: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.lock().get(key).cloned()
    }
}

fn endpoint_key(transport: &TransportConfig) -> &str {
    match transport {
        TransportConfig::Sse { url, .. } | TransportConfig::StreamableHttp { url, .. } => url,
        TransportConfig::Stdio { command, .. } => command,
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _session_id: &str,
        transport: &TransportConfig,
        on_spawn: &(dyn Fn(u32) + Send + Sync),
    ) -> McpResult<Arc<dyn ToolProvider>> {
        let key = endpoint_key(transport);
        let endpoint = self
            .endpoint(key)
            .ok_or_else(|| McpError::ConnectionFailed(format!("{}: connection refused", key)))?;

        if let (TransportConfig::Stdio { .. }, Some(pid)) = (transport, endpoint.server.pid) {
            on_spawn(pid);
        }

        if let Some(gate) = &endpoint.server.gate {
            gate.notified().await;
        }

        endpoint.handshakes.fetch_add(1, Ordering::SeqCst);
        if endpoint.server.fail_handshake {
            return Err(McpError::InitializationFailed(format!(
                "{}: handshake rejected",
                key
            )));
        }

        let pid = match transport {
            TransportConfig::Stdio { .. } => endpoint.server.pid,
            _ => None,
        };
        Ok(Arc::new(MockToolProvider { endpoint, pid }))
    }
}

struct MockToolProvider {
    endpoint: Arc<Endpoint>,
    pid: Option<u32>,
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        if self.endpoint.server.fail_discovery {
            return Err(McpError::Protocol("tools/list not supported".to_string()));
        }
        Ok(self
            .endpoint
            .server
            .tools
            .iter()
            .map(|t| t.descriptor.clone())
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        self.endpoint
            .calls
            .lock()
            .push((name.to_string(), arguments.clone()));

        let tool = self
            .endpoint
            .server
            .tools
            .iter()
            .find(|t| t.descriptor.name == name)
            .ok_or_else(|| McpError::ToolCallFailed(format!("unknown tool: {}", name)))?;

        match &tool.behavior {
            MockBehavior::Echo => {
                let message = arguments
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(ToolOutcome::text(message, false))
            }
            MockBehavior::Add => {
                let a = arguments.get("a").and_then(Value::as_f64).unwrap_or(0.0);
                let b = arguments.get("b").and_then(Value::as_f64).unwrap_or(0.0);
                Ok(ToolOutcome::text(format_number(a + b), false))
            }
            MockBehavior::Fixed(text) => Ok(ToolOutcome::text(text.clone(), false)),
            MockBehavior::ProviderError(text) => Ok(ToolOutcome::text(text.clone(), true)),
            MockBehavior::TransportError(reason) => Err(McpError::ToolCallFailed(reason.clone())),
        }
    }

    async fn close(&self) -> McpResult<()> {
        self.endpoint.closes.fetch_add(1, Ordering::SeqCst);
        if self.endpoint.server.fail_close {
            return Err(McpError::Protocol("peer went away".to_string()));
        }
        Ok(())
    }

    fn process_id(&self) -> Option<u32> {
        self.pid
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_tools() {
        let connector = MockConnector::new();
        connector.register(
            "http://localhost:9000/sse",
            MockServer::with_tools(vec![MockTool::echo(), MockTool::add()]),
        );

        let provider = connector
            .connect("s", &TransportConfig::sse("http://localhost:9000/sse"), &|_: u32| {})
            .await
            .unwrap();

        let echoed = provider.call_tool("echo", json!({"message": "hi"})).await.unwrap();
        assert_eq!(echoed.text, "hi");

        let sum = provider.call_tool("add", json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(sum.text, "5");

        assert_eq!(connector.handshakes("http://localhost:9000/sse"), 1);
        assert_eq!(connector.calls("http://localhost:9000/sse").len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_unreachable() {
        let connector = MockConnector::new();
        let result = connector
            .connect("s", &TransportConfig::sse("http://nowhere:1/sse"), &|_: u32| {})
            .await;
        assert!(matches!(result, Err(McpError::ConnectionFailed(_))));
    }
}

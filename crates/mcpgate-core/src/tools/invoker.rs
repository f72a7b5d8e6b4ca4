//! Routes tool calls to the session that owns the tool

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use super::catalog::ToolCatalog;
use crate::error::{GatewayError, GatewayResult};
use crate::logging::Logger;
use crate::mcp::ToolOutcome;
use crate::session::SessionManager;
use crate::types::{ToolCall, ToolResult};

/// Record of one executed tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecution {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    /// Session the call was routed to, if an owner was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Normalized text on success, error wording on failure
    pub output: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub latency_ms: u64,
}

impl ToolExecution {
    /// Result fed back to the completion service
    pub fn to_result(&self) -> ToolResult {
        if self.is_error {
            ToolResult::error(self.call_id.clone(), self.output.clone())
        } else {
            ToolResult::success(self.call_id.clone(), self.output.clone())
        }
    }
}

pub struct ToolInvoker {
    sessions: Arc<SessionManager>,
    catalog: ToolCatalog,
    logger: Arc<dyn Logger>,
}

impl ToolInvoker {
    pub fn new(sessions: Arc<SessionManager>, logger: Arc<dyn Logger>) -> Self {
        let catalog = ToolCatalog::new(sessions.registry().clone());
        Self {
            sessions,
            catalog,
            logger,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    fn route(&self, name: &str) -> GatewayResult<String> {
        self.catalog
            .find_owner(name)
            .ok_or_else(|| GatewayError::ToolNotFound {
                name: name.to_string(),
                available: self.catalog.available_names(),
            })
    }

    /// Call `name` on whichever connected session owns it
    pub async fn invoke(&self, name: &str, arguments: Value) -> GatewayResult<ToolOutcome> {
        let session_id = self.route(name)?;
        self.invoke_on(&session_id, name, arguments).await
    }

    /// Call `name` on a specific session
    pub async fn invoke_on(
        &self,
        session_id: &str,
        name: &str,
        arguments: Value,
    ) -> GatewayResult<ToolOutcome> {
        self.sessions.invoke(session_id, name, arguments).await
    }

    /// Run one requested call, turning any failure into an error result
    pub async fn execute_tool_call(&self, call: &ToolCall) -> ToolExecution {
        let started = Instant::now();

        let (session_id, result) = match self.route(&call.name) {
            Ok(session_id) => {
                let result = self
                    .invoke_on(&session_id, &call.name, call.arguments.clone())
                    .await;
                (Some(session_id), result)
            }
            Err(e) => (None, Err(e)),
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        let (output, is_error, error_kind) = match result {
            Ok(outcome) => (outcome.text, false, None),
            Err(e) => {
                self.logger.warn(&format!(
                    "[ToolInvoker] Call {} to {} failed: {}",
                    call.id, call.name, e
                ));
                (e.tool_feedback(), true, Some(e.kind().to_string()))
            }
        };

        self.logger.debug(&format!(
            "[ToolInvoker] {} ({}) finished in {}ms",
            call.name, call.id, latency_ms
        ));

        ToolExecution {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments: call.arguments.clone(),
            session_id,
            output,
            is_error,
            error_kind,
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::mock::{MockBehavior, MockConnector, MockServer, MockTool};
    use crate::mcp::TransportConfig;
    use serde_json::json;

    async fn invoker_with_two_sessions() -> (Arc<MockConnector>, ToolInvoker) {
        let connector = Arc::new(MockConnector::new());
        connector.register(
            "http://first:1/sse",
            MockServer::with_tools(vec![MockTool::echo(), MockTool::add()]),
        );
        connector.register(
            "http://second:1/sse",
            MockServer::with_tools(vec![
                MockTool::fixed("echo", "shadowed"),
                MockTool::failing("fetch", MockBehavior::ProviderError("404 Not Found".to_string())),
                MockTool::failing("crash", MockBehavior::TransportError("connection reset".to_string())),
            ]),
        );

        let sessions = Arc::new(SessionManager::new(connector.clone(), Arc::new(NoOpLogger)));
        sessions.open(TransportConfig::sse("http://first:1/sse")).await.unwrap();
        sessions.open(TransportConfig::sse("http://second:1/sse")).await.unwrap();

        (connector, ToolInvoker::new(sessions, Arc::new(NoOpLogger)))
    }

    #[tokio::test]
    async fn test_routes_to_unique_owner() {
        let (connector, invoker) = invoker_with_two_sessions().await;

        let outcome = invoker.invoke("echo", json!({"message": "hi"})).await.unwrap();
        assert_eq!(outcome.text, "hi");
        assert_eq!(connector.calls("http://first:1/sse").len(), 1);
        assert!(connector.calls("http://second:1/sse").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_lists_available_names() {
        let (_connector, invoker) = invoker_with_two_sessions().await;

        let err = invoker.invoke("frobnicate", json!({})).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tool 'frobnicate' not found. Available tools: echo, add, fetch, crash"
        );
    }

    #[tokio::test]
    async fn test_execute_tool_call_reports_failures_as_results() {
        let (_connector, invoker) = invoker_with_two_sessions().await;

        let ok = invoker
            .execute_tool_call(&ToolCall::new("c1", "add", json!({"a": 2, "b": 3})))
            .await;
        assert!(!ok.is_error);
        assert_eq!(ok.output, "5");
        assert!(ok.session_id.is_some());
        assert_eq!(ok.to_result(), ToolResult::success("c1", "5"));

        let reported = invoker
            .execute_tool_call(&ToolCall::new("c2", "fetch", json!({})))
            .await;
        assert!(reported.is_error);
        assert_eq!(reported.output, "Error: 404 Not Found");
        assert_eq!(reported.error_kind.as_deref(), Some("tool_reported"));

        let transport = invoker
            .execute_tool_call(&ToolCall::new("c3", "crash", json!({})))
            .await;
        assert_eq!(
            transport.output,
            "Error: tool 'crash' failed: Tool call failed: connection reset"
        );

        let missing = invoker
            .execute_tool_call(&ToolCall::new("c4", "frobnicate", json!({})))
            .await;
        assert!(missing.is_error);
        assert!(missing.session_id.is_none());
        assert_eq!(missing.error_kind.as_deref(), Some("tool_not_found"));
        assert_eq!(missing.to_result().call_id, "c4");
    }
}

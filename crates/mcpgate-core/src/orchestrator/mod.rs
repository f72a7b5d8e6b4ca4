//! Agentic tool-calling loop
//!
//! One `run` is one user turn: ask the completion service, execute the tool
//! calls it requests, feed the results back, and repeat until it answers
//! without tool calls or the iteration ceiling is hit.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::completion::{
    ChatTurnRequest, CompletionReply, CompletionService, FollowUpRequest, PromptOverrides,
    ProviderError,
};
use crate::error::{GatewayError, GatewayResult};
use crate::logging::Logger;
use crate::tools::{ToolExecution, ToolInvoker};
use crate::types::{ChatMessage, TokenUsage, ToolCall, ToolDescriptor, ToolResult};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub overrides: PromptOverrides,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_overrides(mut self, overrides: PromptOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Text of the last completion reply
    pub reply: String,
    /// Every tool call executed during the turn, in request order
    pub tool_calls: Vec<ToolExecution>,
    /// Tool-calling rounds executed
    pub iterations: usize,
    /// The last reply still asked for tools when the ceiling stopped the loop
    pub ceiling_reached: bool,
    /// Summed over every completion round of the turn
    pub usage: TokenUsage,
}

/// Per-turn accumulator
#[derive(Default)]
struct TurnState {
    calls: Vec<ToolCall>,
    results: Vec<ToolResult>,
    executions: Vec<ToolExecution>,
    iterations: usize,
    usage: TokenUsage,
}

pub struct Orchestrator {
    invoker: Arc<ToolInvoker>,
    completion: Arc<dyn CompletionService>,
    max_iterations: usize,
    completion_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl Orchestrator {
    pub fn new(
        invoker: Arc<ToolInvoker>,
        completion: Arc<dyn CompletionService>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            invoker,
            completion,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            completion_timeout: Duration::from_secs(120),
            logger,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    async fn bounded<F>(&self, round: F) -> GatewayResult<CompletionReply>
    where
        F: std::future::Future<Output = Result<CompletionReply, ProviderError>>,
    {
        match tokio::time::timeout(self.completion_timeout, round).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(ProviderError::timeout(self.completion.name(), self.completion_timeout).into()),
        }
    }

    pub async fn run(&self, request: TurnRequest) -> GatewayResult<TurnOutcome> {
        if request.message.trim().is_empty() {
            return Err(GatewayError::invalid_input("message must not be empty"));
        }

        let tools: Vec<ToolDescriptor> = self.invoker.catalog().llm_tools();
        if tools.is_empty() {
            self.logger
                .debug("[Orchestrator] No connected tools; running a plain conversation");
        }

        let mut state = TurnState::default();
        let mut reply = self
            .bounded(self.completion.chat(ChatTurnRequest {
                message: request.message.clone(),
                history: request.history.clone(),
                tools: tools.clone(),
                overrides: request.overrides.clone(),
            }))
            .await?;
        state.usage.add(reply.usage);

        let mut ceiling_reached = false;
        loop {
            if !reply.wants_tools() {
                break;
            }
            if state.iterations >= self.max_iterations {
                self.logger.warn(&format!(
                    "[Orchestrator] Reached the limit of {} tool iterations; returning the last reply",
                    self.max_iterations
                ));
                ceiling_reached = true;
                break;
            }

            self.logger.info(&format!(
                "[Orchestrator] Iteration {}: executing {} tool call(s)",
                state.iterations + 1,
                reply.tool_calls.len()
            ));

            let executions = join_all(
                reply
                    .tool_calls
                    .iter()
                    .map(|call| self.invoker.execute_tool_call(call)),
            )
            .await;

            state.calls.extend(reply.tool_calls.iter().cloned());
            state.results.extend(executions.iter().map(ToolExecution::to_result));
            state.executions.extend(executions);
            state.iterations += 1;

            reply = self
                .bounded(self.completion.continue_chat(FollowUpRequest {
                    message: request.message.clone(),
                    history: request.history.clone(),
                    tool_calls: state.calls.clone(),
                    tool_results: state.results.clone(),
                    tools: tools.clone(),
                    overrides: request.overrides.clone(),
                }))
                .await?;
            state.usage.add(reply.usage);
        }

        Ok(TurnOutcome {
            reply: reply.text,
            tool_calls: state.executions,
            iterations: state.iterations,
            ceiling_reached,
            usage: state.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::mcp::mock::{MockBehavior, MockConnector, MockServer, MockTool};
    use crate::mcp::TransportConfig;
    use crate::session::SessionManager;
    use serde_json::json;

    const URL: &str = "http://tools:1/sse";

    async fn connected_invoker(tools: Vec<MockTool>) -> (Arc<MockConnector>, Arc<ToolInvoker>) {
        let connector = Arc::new(MockConnector::new());
        connector.register(URL, MockServer::with_tools(tools));
        let sessions = Arc::new(SessionManager::new(connector.clone(), Arc::new(NoOpLogger)));
        sessions.open(TransportConfig::sse(URL)).await.unwrap();
        (connector, Arc::new(ToolInvoker::new(sessions, Arc::new(NoOpLogger))))
    }

    fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall::new(id, name, arguments)
    }

    #[tokio::test]
    async fn test_echo_turn() {
        let (_connector, invoker) = connected_invoker(vec![MockTool::echo(), MockTool::add()]).await;
        let completion = Arc::new(
            ScriptedCompletion::new()
                .then_reply(
                    CompletionReply::text("")
                        .with_tool_calls(vec![call("c1", "echo", json!({"message": "hi"}))])
                        .with_usage(TokenUsage::new(10, 4)),
                )
                .then_reply(CompletionReply::text("The tool said: hi").with_usage(TokenUsage::new(20, 6))),
        );
        let orchestrator = Orchestrator::new(invoker, completion.clone(), Arc::new(NoOpLogger));

        let outcome = orchestrator.run(TurnRequest::new("Echo hi")).await.unwrap();

        assert_eq!(outcome.reply, "The tool said: hi");
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.ceiling_reached);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].output, "hi");
        assert!(!outcome.tool_calls[0].is_error);
        assert_eq!(outcome.usage, TokenUsage::new(30, 10));

        let asked = completion.chat_requests();
        let offered: Vec<&str> = asked[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(offered, vec!["echo", "add"]);

        let follow_up = &completion.follow_up_requests()[0];
        assert_eq!(follow_up.tool_results, vec![ToolResult::success("c1", "hi")]);
        assert_eq!(follow_up.message, "Echo hi");
    }

    #[tokio::test]
    async fn test_partial_failures_do_not_abort_the_batch() {
        let (connector, invoker) = connected_invoker(vec![
            MockTool::echo(),
            MockTool::add(),
            MockTool::failing("fetch", MockBehavior::TransportError("connection reset".to_string())),
        ])
        .await;
        let completion = Arc::new(
            ScriptedCompletion::new()
                .then_reply(CompletionReply::text("").with_tool_calls(vec![
                    call("c1", "echo", json!({"message": "one"})),
                    call("c2", "fetch", json!({"url": "https://example.com"})),
                    call("c3", "add", json!({"a": 1, "b": 2})),
                ]))
                .then_reply(CompletionReply::text("done")),
        );
        let orchestrator = Orchestrator::new(invoker, completion.clone(), Arc::new(NoOpLogger));

        let outcome = orchestrator.run(TurnRequest::new("do three things")).await.unwrap();

        let errors: Vec<bool> = outcome.tool_calls.iter().map(|t| t.is_error).collect();
        assert_eq!(errors, vec![false, true, false]);
        assert_eq!(connector.calls(URL).len(), 3);

        let results = &completion.follow_up_requests()[0].tool_results;
        assert_eq!(results[1].call_id, "c2");
        assert!(results[1].is_error);
        assert_eq!(results[1].content, "Error: tool 'fetch' failed: Tool call failed: connection reset");
        assert_eq!(results[2].content, "3");
    }

    #[tokio::test]
    async fn test_follow_ups_carry_every_call_of_the_turn() {
        let (_connector, invoker) = connected_invoker(vec![MockTool::echo()]).await;
        let completion = Arc::new(
            ScriptedCompletion::new()
                .then_reply(CompletionReply::text("").with_tool_calls(vec![call("c1", "echo", json!({"message": "a"}))]))
                .then_reply(CompletionReply::text("").with_tool_calls(vec![call("c2", "echo", json!({"message": "b"}))]))
                .then_reply(CompletionReply::text("ab")),
        );
        let orchestrator = Orchestrator::new(invoker, completion.clone(), Arc::new(NoOpLogger));

        let outcome = orchestrator.run(TurnRequest::new("twice")).await.unwrap();
        assert_eq!(outcome.iterations, 2);

        let follow_ups = completion.follow_up_requests();
        assert_eq!(follow_ups[0].tool_calls.len(), 1);
        let ids: Vec<&str> = follow_ups[1].tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(follow_ups[1].tool_results.len(), 2);
    }

    #[tokio::test]
    async fn test_loop_stops_at_ceiling() {
        let memory = Arc::new(MemoryLogger::new());
        let (connector, invoker) = connected_invoker(vec![MockTool::echo()]).await;
        let completion = Arc::new(ScriptedCompletion::always(
            CompletionReply::text("still working")
                .with_tool_calls(vec![call("loop", "echo", json!({"message": "again"}))]),
        ));
        let orchestrator =
            Orchestrator::new(invoker, completion.clone(), memory.clone()).with_max_iterations(3);

        let outcome = orchestrator.run(TurnRequest::new("never stop")).await.unwrap();

        assert!(outcome.ceiling_reached);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.reply, "still working");
        assert_eq!(outcome.tool_calls.len(), 3);
        assert_eq!(connector.calls(URL).len(), 3);
        assert_eq!(completion.rounds(), 4);
        assert!(memory.contains(LogLevel::Warn, "limit of 3 tool iterations"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let (_connector, invoker) = connected_invoker(vec![MockTool::echo(), MockTool::add()]).await;
        let completion = Arc::new(
            ScriptedCompletion::new()
                .then_reply(CompletionReply::text("").with_tool_calls(vec![call("c1", "frobnicate", json!({}))]))
                .then_reply(CompletionReply::text("I cannot do that")),
        );
        let orchestrator = Orchestrator::new(invoker, completion.clone(), Arc::new(NoOpLogger));

        let outcome = orchestrator.run(TurnRequest::new("frobnicate it")).await.unwrap();
        assert_eq!(outcome.reply, "I cannot do that");

        let result = &completion.follow_up_requests()[0].tool_results[0];
        assert!(result.is_error);
        assert_eq!(result.content, "Tool 'frobnicate' not found. Available tools: echo, add");
    }

    #[tokio::test]
    async fn test_runs_without_tools_and_surfaces_provider_errors() {
        let sessions = Arc::new(SessionManager::new(Arc::new(MockConnector::new()), Arc::new(NoOpLogger)));
        let invoker = Arc::new(ToolInvoker::new(sessions, Arc::new(NoOpLogger)));
        let completion = Arc::new(
            ScriptedCompletion::new()
                .then_reply(CompletionReply::text("hello"))
                .then_fail(ProviderError::missing_api_key("openai")),
        );
        let orchestrator = Orchestrator::new(invoker, completion.clone(), Arc::new(NoOpLogger));

        let outcome = orchestrator.run(TurnRequest::new("hi")).await.unwrap();
        assert_eq!(outcome.reply, "hello");
        assert_eq!(outcome.iterations, 0);
        assert!(completion.chat_requests()[0].tools.is_empty());

        let err = orchestrator.run(TurnRequest::new("hi again")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Completion(ref e) if e.is_credentials()));

        let blank = orchestrator.run(TurnRequest::new("   ")).await.unwrap_err();
        assert_eq!(blank.kind(), "invalid_input");
    }
}

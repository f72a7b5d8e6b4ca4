//! Completion service trait and request/reply shapes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderResult;
use crate::types::{ChatMessage, TokenUsage, ToolCall, ToolDescriptor, ToolResult};

/// Per-turn overrides of the configured prompt settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// First request of a turn
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub tools: Vec<ToolDescriptor>,
    pub overrides: PromptOverrides,
}

/// Follow-up request carrying every tool call and result of the turn so far
#[derive(Debug, Clone)]
pub struct FollowUpRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    /// Every tool call requested so far in this turn, oldest first
    pub tool_calls: Vec<ToolCall>,
    /// One result per entry of `tool_calls`, in the same order
    pub tool_results: Vec<ToolResult>,
    pub tools: Vec<ToolDescriptor>,
    pub overrides: PromptOverrides,
}

impl FollowUpRequest {
    /// Conversation as sent upstream: history, the user message, then each
    /// tool call followed by its result
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(self.message.clone()));
        for (call, result) in self.tool_calls.iter().zip(&self.tool_results) {
            messages.push(ChatMessage::tool_calls("", std::slice::from_ref(call)));
            messages.push(ChatMessage::tool_results(std::slice::from_ref(result)));
        }
        messages
    }
}

/// What the completion service answered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionReply {
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl CompletionReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// The upstream LLM
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Provider identifier used in diagnostics
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatTurnRequest) -> ProviderResult<CompletionReply>;

    async fn continue_chat(&self, request: FollowUpRequest) -> ProviderResult<CompletionReply>;
}

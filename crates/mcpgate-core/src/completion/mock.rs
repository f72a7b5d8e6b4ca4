//! Scripted completion service for testing
//!
//! Answers each round with the next queued step and records every request,
//! so tests can assert on exactly what the orchestrator sent upstream.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatTurnRequest, CompletionReply, CompletionService, FollowUpRequest};

/// One scripted round
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(CompletionReply),
    Fail(ProviderError),
}

#[derive(Default)]
pub struct ScriptedCompletion {
    steps: Mutex<VecDeque<ScriptStep>>,
    /// Answer used once the queue is empty
    fallback: Option<CompletionReply>,
    chats: Mutex<Vec<ChatTurnRequest>>,
    follow_ups: Mutex<Vec<FollowUpRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every round with the same reply
    pub fn always(reply: CompletionReply) -> Self {
        Self {
            fallback: Some(reply),
            ..Default::default()
        }
    }

    pub fn then_reply(self, reply: CompletionReply) -> Self {
        self.steps.lock().push_back(ScriptStep::Reply(reply));
        self
    }

    pub fn then_fail(self, error: ProviderError) -> Self {
        self.steps.lock().push_back(ScriptStep::Fail(error));
        self
    }

    pub fn chat_requests(&self) -> Vec<ChatTurnRequest> {
        self.chats.lock().clone()
    }

    pub fn follow_up_requests(&self) -> Vec<FollowUpRequest> {
        self.follow_ups.lock().clone()
    }

    /// Total number of rounds served
    pub fn rounds(&self) -> usize {
        self.chats.lock().len() + self.follow_ups.lock().len()
    }

    fn next_step(&self) -> ProviderResult<CompletionReply> {
        let step = self.steps.lock().pop_front();
        match step {
            Some(ScriptStep::Reply(reply)) => Ok(reply),
            Some(ScriptStep::Fail(error)) => Err(error),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ProviderError::Other("completion script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatTurnRequest) -> ProviderResult<CompletionReply> {
        self.chats.lock().push(request);
        self.next_step()
    }

    async fn continue_chat(&self, request: FollowUpRequest) -> ProviderResult<CompletionReply> {
        self.follow_ups.lock().push(request);
        self.next_step()
    }
}

//! Completion service abstraction
//!
//! The orchestrator drives any `CompletionService`. Production code uses
//! `GenaiCompletion`; tests script rounds with `ScriptedCompletion`.

mod error;
mod genai_service;
mod mock;
mod traits;

pub use self::error::{ProviderError, ProviderResult};
pub use self::genai_service::{provider_to_env_key, split_model, GenaiCompletion};
pub use self::mock::{ScriptStep, ScriptedCompletion};
pub use self::traits::{
    ChatTurnRequest, CompletionReply, CompletionService, FollowUpRequest, PromptOverrides,
};

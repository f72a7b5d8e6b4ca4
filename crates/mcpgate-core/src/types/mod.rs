//! Core types shared by the catalog, the invoker and the orchestrator

mod message;
mod tool;

pub use message::{ChatMessage, ContentPart, MessageContent, MessageRole};
pub use tool::{TokenUsage, ToolCall, ToolDescriptor, ToolResult};

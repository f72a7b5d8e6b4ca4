//! Completion service backed by the genai crate
//!
//! Handles every genai-supported provider (OpenAI, Anthropic, Gemini, Ollama,
//! ...) plus OpenAI-compatible ones (Azure, OpenRouter, Mistral) through a
//! `ServiceTargetResolver`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest, ChatStreamEvent,
    MessageContent as GenaiContent, Tool as GenaiTool, ToolCall as GenaiToolCall,
    ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatTurnRequest, CompletionReply, CompletionService, FollowUpRequest, PromptOverrides};
use crate::config::CompletionConfig;
use crate::logging::Logger;
use crate::types::{
    ChatMessage, ContentPart, MessageContent, MessageRole, TokenUsage, ToolCall, ToolDescriptor,
};

/// Convert a history message into genai messages
///
/// Tool-use parts become one native assistant tool-call message and each
/// tool-result part becomes its own tool-response message, so the provider
/// can match results to the call ids it issued.
pub fn to_genai_messages(msg: &ChatMessage) -> Vec<GenaiMessage> {
    let parts = match &msg.content {
        MessageContent::Text(text) => return vec![role_message(msg.role, text.clone())],
        MessageContent::Parts(parts) => parts,
    };

    let mut text = Vec::new();
    let mut calls = Vec::new();
    let mut responses = Vec::new();
    for part in parts {
        match part {
            ContentPart::Text { text: t } => text.push(t.as_str()),
            ContentPart::ToolUse { id, name, input } => calls.push(GenaiToolCall {
                call_id: id.clone(),
                fn_name: name.clone(),
                fn_arguments: input.clone(),
                thought_signatures: None,
            }),
            ContentPart::ToolResult { tool_use_id, content, .. } => {
                responses.push(GenaiToolResponse::new(tool_use_id.clone(), content.clone()))
            }
        }
    }

    let mut messages = Vec::new();
    if !text.is_empty() {
        messages.push(role_message(msg.role, text.join("\n")));
    }
    if !calls.is_empty() {
        messages.push(GenaiMessage::from(calls));
    }
    messages.extend(responses.into_iter().map(GenaiMessage::from));
    messages
}

fn role_message(role: MessageRole, text: String) -> GenaiMessage {
    let content = GenaiContent::from(text);
    match role {
        MessageRole::System => GenaiMessage::system(content),
        MessageRole::User => GenaiMessage::user(content),
        MessageRole::Assistant => GenaiMessage::assistant(content),
    }
}

pub fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    GenaiTool::new(tool.name.clone())
        .with_description(tool.description.clone())
        .with_schema(tool.input_schema.clone())
}

pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall::new(tc.call_id.clone(), tc.fn_name.clone(), tc.fn_arguments.clone())
}

/// Environment variable consulted when no explicit key is configured
pub fn provider_to_env_key(provider: &str) -> String {
    match provider.to_lowercase().as_str() {
        "gemini" | "google" => "GEMINI_API_KEY".to_string(),
        "azure" => "AZURE_OPENAI_API_KEY".to_string(),
        "together" => "TOGETHER_API_KEY".to_string(),
        other => format!("{}_API_KEY", other.to_uppercase()),
    }
}

fn requires_api_key(provider: &str) -> bool {
    !matches!(provider.to_lowercase().as_str(), "ollama")
}

/// Split "provider/model" into its parts, falling back to `default_provider`
pub fn split_model(model: &str, default_provider: &str) -> (String, String) {
    match model.split_once('/') {
        Some((provider, name)) if !provider.is_empty() && !name.is_empty() => {
            (provider.to_string(), name.to_string())
        }
        _ => (default_provider.to_string(), model.to_string()),
    }
}

/// Create a genai client that authenticates with `api_key` and routes
/// OpenAI-compatible providers to their endpoints
fn create_client(provider: &str, api_key: Option<String>, api_base: Option<String>) -> Client {
    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let key = api_key.clone();
            Box::pin(async move { Ok(key.map(AuthData::from_single)) })
        },
    );

    let target_provider = provider.to_lowercase();
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let custom_base = api_base.as_ref().map(|u| Endpoint::from_owned(u.clone()));
            let (endpoint, adapter_kind) = match target_provider.as_str() {
                "azure" => (
                    custom_base.unwrap_or_else(|| {
                        Endpoint::from_static("https://your-resource.openai.azure.com/")
                    }),
                    AdapterKind::OpenAI,
                ),
                "openrouter" => (
                    custom_base.unwrap_or_else(|| Endpoint::from_static("https://openrouter.ai/api/v1/")),
                    AdapterKind::OpenAI,
                ),
                "mistral" => (
                    custom_base.unwrap_or_else(|| Endpoint::from_static("https://api.mistral.ai/v1/")),
                    AdapterKind::OpenAI,
                ),
                _ => match custom_base {
                    Some(endpoint) => (endpoint, target.model.adapter_kind),
                    None => return Ok(target),
                },
            };

            let model = ModelIden::new(adapter_kind, target.model.model_name.clone());
            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model,
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

/// Classify a genai failure from its rendered message
fn map_genai_error(provider: &str, error: &genai::Error) -> ProviderError {
    let message = error.to_string();
    let lower = message.to_lowercase();

    if lower.contains("401") || lower.contains("403") || lower.contains("unauthorized") || lower.contains("api key") {
        let status = if lower.contains("403") { 403 } else { 401 };
        ProviderError::api_error(provider, status, message)
    } else if lower.contains("429") || lower.contains("rate limit") {
        ProviderError::rate_limited(provider, message)
    } else if lower.contains("connect") || lower.contains("timed out") || lower.contains("dns") {
        ProviderError::unavailable(provider, message)
    } else {
        ProviderError::api_error(provider, 500, message)
    }
}

/// Completion service for every provider genai can reach
pub struct GenaiCompletion {
    config: CompletionConfig,
    logger: Arc<dyn Logger>,
}

impl GenaiCompletion {
    pub fn new(config: CompletionConfig, logger: Arc<dyn Logger>) -> Self {
        Self { config, logger }
    }

    fn resolve_api_key(&self, provider: &str) -> ProviderResult<Option<String>> {
        if let Some(key) = self.config.api_key.clone().filter(|k| !k.is_empty()) {
            return Ok(Some(key));
        }
        let env_key = provider_to_env_key(provider);
        match std::env::var(&env_key) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            _ if requires_api_key(provider) => Err(ProviderError::missing_api_key(provider)),
            _ => Ok(None),
        }
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: &[ToolDescriptor],
        overrides: &PromptOverrides,
    ) -> ProviderResult<CompletionReply> {
        let model = overrides.model.as_deref().unwrap_or(&self.config.model);
        let (provider, model_name) = split_model(model, &self.config.provider);
        let api_key = self.resolve_api_key(&provider)?;

        self.logger.info(&format!(
            "[GenaiCompletion] chat: provider={}, model={}, messages={}, tools={}",
            provider,
            model_name,
            messages.len(),
            tools.len()
        ));

        let client = create_client(&provider, api_key, self.config.api_base.clone());

        let mut chat_req = ChatRequest::new(messages.iter().flat_map(to_genai_messages).collect());
        let system_prompt = overrides
            .system_prompt
            .as_ref()
            .or(self.config.system_prompt.as_ref());
        if let Some(system) = system_prompt {
            chat_req = chat_req.with_system(system.clone());
        }
        if !tools.is_empty() {
            chat_req = chat_req.with_tools(tools.iter().map(to_genai_tool).collect::<Vec<_>>());
        }

        let mut options = GenaiOptions::default()
            .with_capture_tool_calls(true)
            .with_capture_usage(true);
        if let Some(temperature) = overrides.temperature.or(self.config.temperature) {
            options = options.with_temperature(temperature as f64);
        }

        let response = client
            .exec_chat_stream(model_name.as_str(), chat_req, Some(&options))
            .await
            .map_err(|e| map_genai_error(&provider, &e))?;

        let mut stream = Box::pin(response.stream);
        let mut reply = CompletionReply::default();

        while let Some(event) = stream.next().await {
            match event.map_err(|e| map_genai_error(&provider, &e))? {
                ChatStreamEvent::Chunk(chunk) => reply.text.push_str(&chunk.content),
                ChatStreamEvent::End(end) => {
                    if let Some(calls) = end.captured_tool_calls() {
                        reply.tool_calls = calls.into_iter().map(|tc| from_genai_tool_call(tc)).collect();
                    }
                    if let Some(usage) = &end.captured_usage {
                        reply.usage = TokenUsage::new(
                            usage.prompt_tokens.unwrap_or(0).max(0) as u32,
                            usage.completion_tokens.unwrap_or(0).max(0) as u32,
                        );
                    }
                }
                _ => {}
            }
        }

        self.logger.debug(&format!(
            "[GenaiCompletion] reply: {} chars, {} tool calls",
            reply.text.len(),
            reply.tool_calls.len()
        ));

        Ok(reply)
    }
}

#[async_trait]
impl CompletionService for GenaiCompletion {
    fn name(&self) -> &str {
        &self.config.provider
    }

    async fn chat(&self, request: ChatTurnRequest) -> ProviderResult<CompletionReply> {
        let mut messages = request.history;
        messages.push(ChatMessage::user(request.message));
        self.complete(messages, &request.tools, &request.overrides).await
    }

    async fn continue_chat(&self, request: FollowUpRequest) -> ProviderResult<CompletionReply> {
        let messages = request.to_messages();
        self.complete(messages, &request.tools, &request.overrides).await
    }
}

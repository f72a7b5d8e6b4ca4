//! Gateway settings

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::mcp::TransportConfig;

fn default_connect_timeout() -> u64 {
    30
}

fn default_call_timeout() -> u64 {
    60
}

fn default_completion_timeout() -> u64 {
    120
}

fn default_max_iterations() -> usize {
    10
}

/// Top-level gateway configuration
///
/// Every field has a default, so an empty YAML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Deadline for the transport handshake
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Deadline for tool discovery and each tool call
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Deadline for each completion round-trip
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,
    /// Tool-calling rounds allowed per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub presets: Vec<PresetConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            call_timeout_secs: default_call_timeout(),
            completion_timeout_secs: default_completion_timeout(),
            max_iterations: default_max_iterations(),
            completion: CompletionConfig::default(),
            presets: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    /// Reject configurations the gateway could not run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for preset in &self.presets {
            if preset.id.trim().is_empty() {
                return Err(ConfigError::Invalid("preset id must not be empty".to_string()));
            }
            if !seen.insert(preset.id.as_str()) {
                return Err(ConfigError::PresetExists(preset.id.clone()));
            }
            preset
                .transport
                .validate()
                .map_err(|reason| ConfigError::Invalid(format!("preset '{}': {}", preset.id, reason)))?;
        }
        Ok(())
    }
}

/// Completion service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Provider identifier (e.g., "openai", "anthropic", "ollama")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model name, optionally prefixed with its provider ("anthropic/claude-sonnet-4")
    #[serde(default = "default_model")]
    pub model: String,
    /// Explicit API key; falls back to `<PROVIDER>_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            api_base: None,
            system_prompt: None,
            temperature: None,
        }
    }
}

/// A named, preconfigured tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

//! Transport descriptors for the three supported connection mechanisms

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which mechanism a session uses to reach its tool provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Long-lived server-sent event stream over HTTP
    Sse,
    /// Spawned child process speaking over stdin/stdout
    Stdio,
    /// Single-endpoint HTTP request/response exchange
    StreamableHttp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Sse => write!(f, "sse"),
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::StreamableHttp => write!(f, "streamable_http"),
        }
    }
}

/// Where and how to reach one tool provider
///
/// Serialized with a `transport` tag so preset files read naturally:
///
/// ```yaml
/// transport: stdio
/// command: npx
/// args: ["-y", "@modelcontextprotocol/server-everything"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportConfig {
    Sse {
        url: String,
        /// Bearer token sent as the `Authorization` header
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Stdio {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
    },
    StreamableHttp {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl TransportConfig {
    pub fn sse(url: impl Into<String>) -> Self {
        TransportConfig::Sse {
            url: url.into(),
            token: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn stdio(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TransportConfig::Stdio {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn streamable_http(url: impl Into<String>) -> Self {
        TransportConfig::StreamableHttp {
            url: url.into(),
            token: None,
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            TransportConfig::Sse { .. } => TransportKind::Sse,
            TransportConfig::Stdio { .. } => TransportKind::Stdio,
            TransportConfig::StreamableHttp { .. } => TransportKind::StreamableHttp,
        }
    }

    /// Human-readable endpoint, never including credentials
    pub fn describe(&self) -> String {
        match self {
            TransportConfig::Sse { url, .. } | TransportConfig::StreamableHttp { url, .. } => {
                url.clone()
            }
            TransportConfig::Stdio { command, args, .. } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{} {}", command, args.join(" "))
                }
            }
        }
    }

    /// Reject descriptors that cannot possibly connect, before any I/O
    pub fn validate(&self) -> Result<(), String> {
        match self {
            TransportConfig::Sse { url, headers, .. } => {
                validate_url(url)?;
                if headers.keys().any(|name| name.trim().is_empty()) {
                    return Err("header names must not be empty".to_string());
                }
                Ok(())
            }
            TransportConfig::StreamableHttp { url, .. } => validate_url(url),
            TransportConfig::Stdio { command, .. } => {
                if command.trim().is_empty() {
                    Err("stdio transport requires a command".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn validate_url(url: &str) -> Result<(), String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err("transport url must not be empty".to_string());
    }
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| format!("unsupported url scheme in '{}'", trimmed))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("url '{}' has no host", trimmed));
    }
    Ok(())
}

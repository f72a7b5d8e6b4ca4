//! MCP client using the official rmcp SDK
//!
//! Connects to tool providers over SSE, a spawned stdio process or
//! streamable HTTP.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::{
    model::{CallToolRequestParam, ClientCapabilities, ClientInfo, Implementation, Tool},
    service::RunningService,
    Peer, RoleClient, ServiceExt,
};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use super::error::{McpError, McpResult};
use super::provider::{Connector, ToolOutcome, ToolProvider};
use super::transport::TransportConfig;
use crate::logging::Logger;
use crate::types::ToolDescriptor;

const CLIENT_NAME: &str = "mcpgate";

fn client_info() -> ClientInfo {
    let mut implementation = Implementation::from_build_env();
    implementation.name = CLIENT_NAME.to_string();
    implementation.version = env!("CARGO_PKG_VERSION").to_string();

    let mut info = ClientInfo::default();
    info.capabilities = ClientCapabilities::default();
    info.client_info = implementation;
    info
}

/// A live, initialized connection to one tool provider
pub struct McpConnection {
    peer: Peer<RoleClient>,
    /// Taken on close so a second close is a no-op
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    process_id: Option<u32>,
    label: String,
    logger: Arc<dyn Logger>,
}

impl McpConnection {
    fn new(
        service: RunningService<RoleClient, ClientInfo>,
        process_id: Option<u32>,
        label: String,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            process_id,
            label,
            logger,
        }
    }
}

#[async_trait]
impl ToolProvider for McpConnection {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.info(&format!(
            "[McpClient] Listed {} tools from {}",
            tools.len(),
            self.label
        ));

        Ok(tools.into_iter().map(descriptor_from_tool).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        self.logger
            .debug(&format!("[McpClient] Calling tool {} on {}", name, self.label));

        let params = CallToolRequestParam {
            name: Cow::Owned(name.to_string()),
            arguments: arguments.as_object().cloned(),
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;

        // Read the wire shape so content blocks keep their original JSON form
        let raw = serde_json::to_value(&result)
            .map_err(|e| McpError::Protocol(format!("unreadable tool result: {}", e)))?;
        let content = raw.get("content").cloned().unwrap_or(Value::Array(Vec::new()));
        let is_error = raw.get("isError").and_then(Value::as_bool).unwrap_or(false);

        Ok(ToolOutcome::from_content(content, is_error))
    }

    async fn close(&self) -> McpResult<()> {
        let service = self.service.lock().take();
        let Some(service) = service else {
            return Ok(());
        };

        self.logger
            .info(&format!("[McpClient] Closing connection to {}", self.label));
        service
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }

    fn process_id(&self) -> Option<u32> {
        self.process_id
    }
}

fn descriptor_from_tool(tool: Tool) -> ToolDescriptor {
    ToolDescriptor::new(
        tool.name.to_string(),
        tool.description.map(|d| d.to_string()).unwrap_or_default(),
    )
    .with_schema(Value::Object(tool.input_schema.as_ref().clone()))
}

/// Connector backed by rmcp transports
pub struct RmcpConnector {
    logger: Arc<dyn Logger>,
}

impl RmcpConnector {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    async fn connect_sse(
        &self,
        url: &str,
        token: Option<&str>,
        headers: &BTreeMap<String, String>,
    ) -> McpResult<RunningService<RoleClient, ClientInfo>> {
        use rmcp::transport::{sse_client::SseClientConfig, SseClientTransport};

        let mut header_map = reqwest::header::HeaderMap::new();
        if let Some(token) = token {
            header_map.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token)
                    .parse()
                    .map_err(|e| McpError::ConnectionFailed(format!("auth token: {}", e)))?,
            );
        }
        for (name, value) in headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| McpError::ConnectionFailed(format!("header {}: {}", name, e)))?;
            let value = value
                .parse()
                .map_err(|e| McpError::ConnectionFailed(format!("header {}: {}", name, e)))?;
            header_map.insert(name, value);
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(header_map)
            .build()
            .map_err(|e| McpError::ConnectionFailed(format!("build HTTP client: {}", e)))?;

        let config = SseClientConfig {
            sse_endpoint: url.to_string().into(),
            ..Default::default()
        };

        let transport = SseClientTransport::start_with_client(http_client, config)
            .await
            .map_err(|e| McpError::ConnectionFailed(format!("open event stream: {}", e)))?;

        client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))
    }

    async fn connect_streamable(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> McpResult<RunningService<RoleClient, ClientInfo>> {
        use rmcp::transport::{
            streamable_http_client::StreamableHttpClientTransportConfig,
            StreamableHttpClientTransport,
        };

        let transport = match token {
            Some(token) => {
                let mut config = StreamableHttpClientTransportConfig::with_uri(url);
                config.auth_header = Some(token.to_string());
                StreamableHttpClientTransport::from_config(config)
            }
            None => StreamableHttpClientTransport::from_uri(url),
        };

        client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn connect_stdio(
        &self,
        session_id: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        cwd: Option<&std::path::Path>,
        on_spawn: &(dyn Fn(u32) + Send + Sync),
    ) -> McpResult<(RunningService<RoleClient, ClientInfo>, Option<u32>)> {
        use rmcp::transport::TokioChildProcess;

        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args).envs(env.iter()).kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let (transport, stderr) = TokioChildProcess::builder(cmd)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let pid = transport.id();
        if let Some(pid) = pid {
            self.logger.debug(&format!(
                "[McpClient] Spawned '{}' as pid {} for session {}",
                command, pid, session_id
            ));
            on_spawn(pid);
        }
        if let Some(stderr) = stderr {
            drain_stderr(session_id.to_string(), stderr, self.logger.clone());
        }

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok((service, pid))
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(
        &self,
        session_id: &str,
        transport: &TransportConfig,
        on_spawn: &(dyn Fn(u32) + Send + Sync),
    ) -> McpResult<Arc<dyn ToolProvider>> {
        let label = transport.describe();
        self.logger.info(&format!(
            "[McpClient] Connecting session {} over {}: {}",
            session_id,
            transport.kind(),
            label
        ));

        let (service, pid) = match transport {
            TransportConfig::Sse {
                url,
                token,
                headers,
            } => (self.connect_sse(url, token.as_deref(), headers).await?, None),
            TransportConfig::StreamableHttp { url, token } => {
                (self.connect_streamable(url, token.as_deref()).await?, None)
            }
            TransportConfig::Stdio {
                command,
                args,
                env,
                cwd,
            } => {
                self.connect_stdio(session_id, command, args, env, cwd.as_deref(), on_spawn)
                    .await?
            }
        };

        self.logger
            .info("[McpClient] Connected and initialized successfully");

        Ok(Arc::new(McpConnection::new(
            service,
            pid,
            label,
            self.logger.clone(),
        )))
    }
}

/// Forward a child's stderr to the logger, one debug line per output line
pub(crate) fn drain_stderr<R>(
    session_id: String,
    reader: R,
    logger: Arc<dyn Logger>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => logger.debug(&format!("[stderr {}] {}", session_id, line)),
                Ok(None) => break,
                Err(e) => {
                    logger.debug(&format!("[stderr {}] stream closed: {}", session_id, e));
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger};
    use serde_json::json;

    #[tokio::test]
    async fn test_drain_stderr_logs_each_line() {
        let memory = Arc::new(MemoryLogger::new());
        let reader = std::io::Cursor::new(b"starting up\nready on stdio\n".to_vec());

        drain_stderr("s-1".to_string(), reader, memory.clone())
            .await
            .unwrap();

        assert_eq!(
            memory.messages(LogLevel::Debug),
            vec![
                "[stderr s-1] starting up".to_string(),
                "[stderr s-1] ready on stdio".to_string(),
            ]
        );
    }

    #[test]
    fn test_descriptor_from_tool() {
        let schema = json!({
            "type": "object",
            "required": ["message"]
        });
        let tool = Tool::new(
            "echo",
            "Echo a message back",
            Arc::new(schema.as_object().cloned().unwrap()),
        );

        let descriptor = descriptor_from_tool(tool);
        assert_eq!(descriptor.name, "echo");
        assert_eq!(descriptor.description, "Echo a message back");
        assert_eq!(descriptor.required_keys(), vec!["message"]);
    }

    #[test]
    fn test_client_info_names_gateway() {
        let info = client_info();
        assert_eq!(info.client_info.name, CLIENT_NAME);
        assert_eq!(info.client_info.version, env!("CARGO_PKG_VERSION"));
    }
}

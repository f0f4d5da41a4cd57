//! MCP client lifecycle (connect, discover, call, close).

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult, Tool};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};
use rmcp::transport::{ConfigureCommandExt, IntoTransport, TokioChildProcess};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, TransportConfig};
use crate::error::{Error, Result};

/// A connected, initialized MCP server.
pub struct Client {
    name: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    timeout: Duration,
    closed: AtomicBool,
}

impl Client {
    /// Open the configured transport and perform the initialize handshake.
    ///
    /// A handshake that fails or times out drops the transport, which kills
    /// a spawned server.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        info!(
            server = %config.name,
            transport = config.transport.kind(),
            "connecting to mcp server"
        );
        match &config.transport {
            TransportConfig::Stdio { command, args, env } => {
                let transport = TokioChildProcess::new(Command::new(command).configure(|cmd| {
                    cmd.args(args).envs(env).kill_on_drop(true);
                }))?;
                Self::serve(&config.name, transport, config.timeout()).await
            }
            TransportConfig::Http { url, auth_token } => {
                let mut http = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                if let Some(token) = auth_token {
                    http = http.auth_header(token.clone());
                }
                let transport = StreamableHttpClientTransport::from_config(http);
                Self::serve(&config.name, transport, config.timeout()).await
            }
        }
    }

    /// Initialize a client over any rmcp transport.
    pub async fn serve<T, E, A>(
        name: impl Into<String>,
        transport: T,
        timeout: Duration,
    ) -> Result<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let name = name.into();
        let service = tokio::time::timeout(timeout, ().serve(transport))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Initialize(e.to_string()))
            .inspect_err(|e| warn!(server = %name, error = %e, "mcp initialize failed"))?;
        debug!(server = %name, "mcp server initialized");

        Ok(Self {
            name,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// List every tool the server exposes, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.bounded(self.peer.list_all_tools()).await
    }

    /// Call a tool by name. `arguments` must be an object or null.
    ///
    /// A result flagged `isError` is returned as-is; interpreting it is up to
    /// the caller.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            _ => return Err(Error::InvalidArguments),
        };
        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };
        self.bounded(self.peer.call_tool(params)).await
    }

    /// Stop the service and release the process or connection. Safe to call
    /// any number of times.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let service = self.service.lock().await.take();
        let Some(service) = service else {
            return;
        };
        match service.cancel().await {
            Ok(reason) => debug!(server = %self.name, ?reason, "mcp client closed"),
            Err(e) => warn!(server = %self.name, error = %e, "mcp service task failed"),
        }
    }

    async fn bounded<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, rmcp::ServiceError>>,
    {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::from)
    }
}

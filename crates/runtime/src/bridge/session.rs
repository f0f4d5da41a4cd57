//! One connected tool provider.

use super::schema::{apply_defaults, normalize_input_schema};
use crate::error::BridgeError;
use crate::tools::{ToolDescriptor, ToolError};
use mcp::{CallToolResult, Client, ServerConfig, Tool, ToolAnnotations};
use policy::SideEffect;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Returned when a tool answers with nothing usable.
pub const EMPTY_RESULT: &str = "Tool returned no content";

/// A connected provider and the tools it advertised.
pub struct BridgeSession {
    provider: String,
    client: Client,
    tools: Vec<ToolDescriptor>,
    defaults: Map<String, Value>,
}

impl BridgeSession {
    /// Connect, initialize and discover tools.
    ///
    /// Any transport opened along the way is closed before an error is
    /// returned.
    pub async fn connect(
        config: &ServerConfig,
        defaults: Map<String, Value>,
    ) -> Result<Self, BridgeError> {
        let initialization = |source| BridgeError::Initialization {
            provider: config.name.clone(),
            source,
        };

        let client = Client::connect(config).await.map_err(initialization)?;
        Self::start(config.name.clone(), client, defaults)
            .await
            .map_err(initialization)
    }

    /// Discover tools over an initialized client.
    pub async fn start(
        provider: impl Into<String>,
        client: Client,
        defaults: Map<String, Value>,
    ) -> Result<Self, mcp::Error> {
        let provider = provider.into();
        let listed = match client.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                debug!(provider = %provider, error = %e, "closing after failed discovery");
                client.close().await;
                return Err(e);
            }
        };

        let tools = listed
            .into_iter()
            .map(|tool| describe(tool, &defaults))
            .collect::<Vec<_>>();
        info!(provider = %provider, tools = tools.len(), "tool provider connected");

        Ok(Self {
            provider,
            client,
            tools,
            defaults,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Descriptors with normalized schemas and defaults applied.
    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Call a remote tool, keeping failures apart from output.
    pub async fn try_call(&self, tool: &str, args: Value) -> Result<String, ToolError> {
        let result = self
            .client
            .call_tool(tool, args)
            .await
            .map_err(|e| match e {
                mcp::Error::Timeout => ToolError::Execution(format!("{tool} timed out")),
                other => ToolError::Execution(other.to_string()),
            })?;

        let text = render_result(&result);
        if result.is_error == Some(true) {
            return Err(ToolError::Execution(text));
        }
        Ok(text)
    }

    /// Call a remote tool. Failures come back as error text.
    pub async fn call(&self, tool: &str, args: Value) -> String {
        self.try_call(tool, args).await.unwrap_or_else(|e| {
            warn!(provider = %self.provider, tool, error = %e, "remote tool failed");
            e.to_string()
        })
    }

    /// Close the connection. Later calls are no-ops.
    pub async fn close(&self) {
        self.client.close().await;
    }
}

fn describe(tool: Tool, defaults: &Map<String, Value>) -> ToolDescriptor {
    let mut schema = normalize_input_schema(Value::Object((*tool.input_schema).clone()));
    apply_defaults(&mut schema, defaults);
    let effect = side_effect(tool.annotations.as_ref());
    ToolDescriptor::new(
        tool.name,
        tool.description.map(String::from).unwrap_or_default(),
        schema,
        effect,
    )
}

/// Side effect implied by a tool's annotations.
pub fn side_effect(annotations: Option<&ToolAnnotations>) -> SideEffect {
    let Some(annotations) = annotations else {
        return SideEffect::Update;
    };
    if annotations.read_only_hint == Some(true) {
        SideEffect::Read
    } else if annotations.destructive_hint == Some(true) {
        SideEffect::Delete
    } else {
        SideEffect::Update
    }
}

/// Text blocks joined by blank lines, else the structured value, else a
/// placeholder.
pub fn render_result(result: &CallToolResult) -> String {
    let blocks: Vec<&str> = result
        .content
        .iter()
        .filter_map(|c| c.raw.as_text())
        .map(|t| t.text.as_str())
        .collect();
    if !blocks.is_empty() {
        return blocks.join("\n\n");
    }

    match &result.structured_content {
        Some(Value::Null) | None => EMPTY_RESULT.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

//! Remote tools as [`Tool`] trait objects.

use super::schema::{argument_validator, fill_defaults, validate_arguments};
use super::session::BridgeSession;
use crate::tools::{Tool, ToolDescriptor, ToolError};
use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// One tool of a [`BridgeSession`].
pub struct BridgeTool {
    session: Arc<BridgeSession>,
    descriptor: ToolDescriptor,
    validator: Option<Validator>,
}

impl BridgeTool {
    /// Wrap a descriptor, compiling its parameter schema once.
    ///
    /// A schema that does not compile leaves argument checking to the
    /// server.
    pub fn new(session: Arc<BridgeSession>, descriptor: ToolDescriptor) -> Self {
        let validator = match argument_validator(&descriptor.parameters) {
            Ok(validator) => Some(validator),
            Err(e) => {
                warn!(
                    provider = %session.provider(),
                    tool = %descriptor.name,
                    error = %e,
                    "unusable parameter schema"
                );
                None
            }
        };
        Self {
            session,
            descriptor,
            validator,
        }
    }

    /// Every tool the session advertised.
    pub fn all(session: &Arc<BridgeSession>) -> Vec<Self> {
        session
            .list_tools()
            .iter()
            .cloned()
            .map(|descriptor| Self::new(Arc::clone(session), descriptor))
            .collect()
    }
}

#[async_trait]
impl Tool for BridgeTool {
    fn describe(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, mut args: Value) -> Result<Value, ToolError> {
        fill_defaults(&mut args, &self.descriptor.parameters, self.session.defaults());
        if let Some(validator) = &self.validator {
            validate_arguments(validator, &args).map_err(ToolError::InvalidInput)?;
        }

        self.session
            .try_call(&self.descriptor.name, args)
            .await
            .map(Value::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;
    use serde_json::{Map, json};

    async fn tools(server: &FakeServer) -> Vec<BridgeTool> {
        let mut defaults = Map::new();
        defaults.insert("project".into(), json!("OPS"));
        let session = BridgeSession::start("atlassian", server.client("atlassian").await, defaults)
            .await
            .unwrap();
        BridgeTool::all(&Arc::new(session))
    }

    fn server() -> FakeServer {
        FakeServer::new(vec![json!({
            "name": "create_issue",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project": {"type": "string"},
                    "title": {"type": "string"},
                    "priority": {"enum": ["low", "high"]}
                },
                "required": ["project", "title"],
                "additionalProperties": false
            }
        })])
        .reply("create_issue", json!({"content": [{"type": "text", "text": "OPS-9"}]}))
    }

    #[tokio::test]
    async fn defaults_are_filled_before_the_call() {
        let server = server();
        let tools = tools(&server).await;
        assert_eq!(tools.len(), 1);

        let output = tools[0].invoke(json!({"title": "Crash"})).await.unwrap();
        assert_eq!(output, json!("OPS-9"));
        assert_eq!(
            server.calls.lock().unwrap()[0].1,
            json!({"project": "OPS", "title": "Crash"})
        );
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_server() {
        let server = server();
        let tools = tools(&server).await;

        for bad in [
            json!({"title": 5}),
            json!({"title": "Crash", "priority": "urgent"}),
            json!({"title": "Crash", "assignee": "me"}),
        ] {
            let err = tools[0].invoke(bad).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidInput(_)), "{err}");
        }
        assert!(server.calls.lock().unwrap().is_empty());
    }
}

//! Test doubles shared by the unit tests.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, StructuredRequest,
    StructuredResponse, ToolCall, Usage,
};
use crate::tools::{SharedTool, Tool, ToolDescriptor, ToolError};
use async_trait::async_trait;
use policy::SideEffect;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

/// What a scripted backend saw.
#[derive(Debug, Clone)]
pub(crate) struct Seen {
    pub system: Option<String>,
    pub tools: Vec<String>,
    pub messages: Vec<Message>,
    pub structured_name: Option<String>,
}

/// Backend replaying canned turns.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    turns: Mutex<VecDeque<Message>>,
    structured: Mutex<VecDeque<Value>>,
    repeat: Option<Message>,
    delay: Duration,
    pub seen: Mutex<Vec<Seen>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn(self, message: Message) -> Self {
        self.turns.lock().unwrap().push_back(message);
        self
    }

    pub fn structured(self, value: Value) -> Self {
        self.structured.lock().unwrap().push_back(value);
        self
    }

    /// Answer every unscripted turn with `message`.
    pub fn repeat(mut self, message: Message) -> Self {
        self.repeat = Some(message);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.seen.lock().unwrap().push(Seen {
            system: request.system.map(str::to_string),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            messages: request.messages.to_vec(),
            structured_name: None,
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.turns.lock().unwrap().pop_front();
        let message = next
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| ModelError::Api("script exhausted".into()))?;
        Ok(ModelResponse {
            message,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
            },
        })
    }

    async fn structured(
        &self,
        request: StructuredRequest<'_>,
    ) -> Result<StructuredResponse, ModelError> {
        self.seen.lock().unwrap().push(Seen {
            system: Some(request.system.to_string()),
            tools: Vec::new(),
            messages: request.messages.to_vec(),
            structured_name: Some(request.name.to_string()),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let value = self
            .structured
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Api("script exhausted".into()))?;
        Ok(StructuredResponse {
            value,
            usage: Usage::default(),
        })
    }
}

/// An assistant turn proposing `(id, name, input)` calls.
pub(crate) fn calls(proposed: &[(&str, &str, Value)]) -> Message {
    Message::assistant_calls(
        "",
        proposed
            .iter()
            .map(|(id, name, input)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect(),
    )
}

/// Tool answering with a fixed reply.
pub(crate) struct StubTool {
    descriptor: ToolDescriptor,
    reply: Result<String, ToolError>,
    delay: Duration,
    invocations: AtomicUsize,
}

impl StubTool {
    pub fn new(name: &str, reply: &str) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                name,
                format!("Stub tool {name}"),
                json!({"type": "object", "properties": {}}),
                SideEffect::Read,
            ),
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            reply: Err(ToolError::Execution(message.to_string())),
            ..Self::new(name, "")
        }
    }

    pub fn shared(name: &str, reply: &str) -> SharedTool {
        Arc::new(Self::new(name, reply))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.descriptor.side_effect = effect;
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StubTool {
    fn describe(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _args: Value) -> Result<Value, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map(Value::String)
    }
}

/// Tool whose handler panics.
pub(crate) struct PanickingTool {
    descriptor: ToolDescriptor,
}

impl PanickingTool {
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: ToolDescriptor::new(name, "Always panics", json!({}), SideEffect::Read),
        }
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn describe(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _args: Value) -> Result<Value, ToolError> {
        panic!("handler bug");
    }
}

/// In-memory MCP server answering over a duplex pipe.
#[derive(Clone, Default)]
pub(crate) struct FakeServer {
    tools: Arc<Vec<Value>>,
    replies: Arc<HashMap<String, Value>>,
    fail_listing: bool,
    pub calls: Arc<Mutex<Vec<(String, Value)>>>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeServer {
    pub fn new(tools: Vec<Value>) -> Self {
        Self {
            tools: Arc::new(tools),
            ..Self::default()
        }
    }

    /// Answer `tools/call` for `tool` with `result`.
    pub fn reply(mut self, tool: &str, result: Value) -> Self {
        Arc::make_mut(&mut self.replies).insert(tool.to_string(), result);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Hang-ups seen so far, giving a pending one a moment to land.
    pub async fn closed(&self) -> usize {
        for _ in 0..100 {
            if self.close_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.close_count()
    }

    pub async fn client(&self, name: &str) -> mcp::Client {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        tokio::spawn(self.clone().run(server_end));
        mcp::Client::serve(name, client_end, Duration::from_secs(5))
            .await
            .unwrap()
    }

    async fn run(self, stream: DuplexStream) {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            // notifications carry no id
            let (Some(id), Some(method)) = (message.get("id"), message["method"].as_str()) else {
                continue;
            };
            let reply = match self.answer(method, &message["params"]) {
                Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err(error) => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32603, "message": error}
                }),
            };
            let mut line = reply.to_string();
            line.push('\n');
            if write.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn answer(&self, method: &str, params: &Value) -> Result<Value, String> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "fake", "version": "0.0.0"}
            })),
            "tools/list" if self.fail_listing => Err("listing unavailable".to_string()),
            "tools/list" => Ok(json!({"tools": self.tools.as_slice()})),
            "tools/call" => {
                let name = params["name"].as_str().unwrap_or_default().to_string();
                let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                self.calls.lock().unwrap().push((name.clone(), args));
                self.replies
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| format!("unknown tool {name}"))
            }
            other => Err(format!("unsupported method {other}")),
        }
    }
}

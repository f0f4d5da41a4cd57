//! Bounded ReAct execution loop.
//!
//! The engine alternates model turns and tool dispatch until the model
//! answers without proposing tools, or until `max_cycles` model turns have
//! been spent. Tool failures of any kind are fed back to the model as error
//! results; only model failures and the cycle bound end a run early.

use crate::model::{
    Backend, Message, ModelRequest, ModelResponse, ToolCall, ToolOutcome, ToolResult, ToolSpec,
    Usage, timed,
};
use crate::tools::{ToolCatalog, ToolError};
use crate::tracker::ToolObserver;
use crate::{Error, Result};
use futures::FutureExt;
use futures::future::join_all;
use policy::{Decision, Policy, ToolRequest};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model turns allowed per run.
    pub max_cycles: usize,
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cycles: 10,
            model_timeout_secs: 120,
            tool_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Execution {
    pub answer: String,
    /// History, the user message, then every message the run produced.
    pub transcript: Vec<Message>,
    /// Model turns spent.
    pub cycles: usize,
    pub usage: Usage,
}

enum State {
    AwaitingModel,
    DispatchingTools(Vec<ToolCall>),
    Done(String),
}

/// Runs the model/tool loop over one catalog.
pub struct Engine<'a, B: Backend> {
    backend: &'a B,
    catalog: &'a ToolCatalog,
    config: EngineConfig,
    policy: Option<&'a Policy>,
    observer: Option<&'a dyn ToolObserver>,
}

impl<'a, B: Backend> Engine<'a, B> {
    pub fn new(backend: &'a B, catalog: &'a ToolCatalog, config: EngineConfig) -> Self {
        Self {
            backend,
            catalog,
            config,
            policy: None,
            observer: None,
        }
    }

    /// Check every call against `policy` before invoking it.
    pub fn policy(mut self, policy: &'a Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Report every invocation to `observer`.
    pub fn observer(mut self, observer: &'a dyn ToolObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run until the model answers in text.
    pub async fn run(&self, system: &str, history: &[Message], message: &str) -> Result<Execution> {
        let specs = self.catalog.specs();
        let mut transcript = Vec::with_capacity(history.len() + 1);
        transcript.extend_from_slice(history);
        transcript.push(Message::user(message));

        let mut usage = Usage::default();
        let mut cycles = 0;
        let mut state = State::AwaitingModel;

        loop {
            state = match state {
                State::AwaitingModel => {
                    if cycles >= self.config.max_cycles {
                        warn!(max_cycles = self.config.max_cycles, "cycle limit reached");
                        return Err(Error::CycleLimit {
                            max_cycles: self.config.max_cycles,
                        });
                    }
                    cycles += 1;

                    let reply = self.turn(system, &transcript, &specs).await?;
                    usage += reply.usage;
                    let calls = reply.message.tool_calls();
                    let text = reply.message.text();
                    transcript.push(reply.message);

                    if calls.is_empty() {
                        State::Done(text)
                    } else {
                        debug!(cycle = cycles, calls = calls.len(), "model proposed tools");
                        State::DispatchingTools(calls)
                    }
                }
                State::DispatchingTools(calls) => {
                    let results = join_all(calls.into_iter().map(|call| self.dispatch(call))).await;
                    transcript.extend(results.into_iter().map(Message::tool_result));
                    State::AwaitingModel
                }
                State::Done(answer) => {
                    return Ok(Execution {
                        answer,
                        transcript,
                        cycles,
                        usage,
                    });
                }
            };
        }
    }

    async fn turn(
        &self,
        system: &str,
        transcript: &[Message],
        specs: &[ToolSpec],
    ) -> Result<ModelResponse> {
        let request = ModelRequest {
            system: Some(system),
            messages: transcript,
            tools: specs,
        };
        Ok(timed(self.config.model_timeout(), self.backend.call(request)).await?)
    }

    async fn dispatch(&self, call: ToolCall) -> ToolResult {
        let run_id = Uuid::new_v4();
        self.notify(|o| o.on_tool_start(run_id, &call.name, &call.input));

        let outcome = match self.invoke(&call).await {
            Ok(output) => ToolOutcome::success_json(output),
            Err(e) => {
                debug!(tool = %call.name, error = %e, "tool call failed");
                ToolOutcome::error(e.to_string())
            }
        };

        self.notify(|o| o.on_tool_end(run_id, &outcome));
        ToolResult {
            tool_call_id: call.id,
            outcome,
        }
    }

    async fn invoke(&self, call: &ToolCall) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .catalog
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        if let Some(policy) = self.policy {
            let request = ToolRequest::new(&call.name, tool.describe().side_effect);
            if let Decision::Deny { reason } = policy.check(&request) {
                return Err(ToolError::CapabilityDenied(reason));
            }
        }

        let limit = self.config.tool_timeout();
        let invocation = AssertUnwindSafe(tool.invoke(call.input.clone())).catch_unwind();
        match tokio::time::timeout(limit, invocation).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                warn!(tool = %call.name, "tool panicked");
                Err(ToolError::Execution(format!("tool {} panicked", call.name)))
            }
            Err(_) => Err(ToolError::Timeout(limit.as_millis() as u64)),
        }
    }

    fn notify(&self, event: impl FnOnce(&dyn ToolObserver)) {
        let Some(observer) = self.observer else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| event(observer))).is_err() {
            warn!("tool observer panicked");
        }
    }
}

//! Advisory plan generation.
//!
//! The plan is produced once per run from the selected tools and injected
//! into the execution prompt. The engine is free to deviate from it.

use crate::model::{Backend, Message, StructuredRequest, Usage, decode, timed};
use crate::prompts;
use crate::tools::ToolCatalog;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, warn};

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
    /// Call `tool` with `args`.
    Tool {
        tool: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    /// A thought that needs no tool.
    Reason { note: String },
}

/// A validated plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    /// Tool names of steps removed because the catalog lacks them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
}

impl Plan {
    /// Keep only steps the catalog can execute.
    pub fn validate(steps: Vec<PlanStep>, catalog: &ToolCatalog) -> Self {
        let mut plan = Self::default();
        for step in steps {
            match &step {
                PlanStep::Tool { tool, .. } if !catalog.contains(tool) => {
                    warn!(tool = %tool, "dropping plan step for unknown tool");
                    plan.dropped.push(tool.clone());
                }
                _ => plan.steps.push(step),
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Numbered text for the execution prompt; empty for an empty plan.
    pub fn format(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            let _ = match step {
                PlanStep::Tool { tool, args } if args.is_empty() => {
                    writeln!(out, "{n}. Call {tool}")
                }
                PlanStep::Tool { tool, args } => {
                    writeln!(out, "{n}. Call {tool} with {}", Value::Object(args.clone()))
                }
                PlanStep::Reason { note } => writeln!(out, "{n}. {note}"),
            };
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Vec<PlanStep>,
}

/// Output schema for plan generation.
pub fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "steps": {
                "type": "array",
                "items": {
                    "anyOf": [
                        {
                            "type": "object",
                            "properties": {
                                "kind": {"type": "string", "enum": ["tool"]},
                                "tool": {"type": "string"},
                                "args": {"type": "object"}
                            },
                            "required": ["kind", "tool", "args"]
                        },
                        {
                            "type": "object",
                            "properties": {
                                "kind": {"type": "string", "enum": ["reason"]},
                                "note": {"type": "string"}
                            },
                            "required": ["kind", "note"]
                        }
                    ]
                }
            }
        },
        "required": ["steps"]
    })
}

/// Generates a plan over a tool catalog.
pub struct Planner<'a, B: Backend> {
    backend: &'a B,
    timeout: Duration,
}

impl<'a, B: Backend> Planner<'a, B> {
    pub fn new(backend: &'a B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Plan the steps for `message`.
    ///
    /// `instructions` holds the categories' default instructions followed
    /// by caller-supplied ones.
    pub async fn plan(
        &self,
        catalog: &ToolCatalog,
        instructions: &[String],
        history: &[Message],
        message: &str,
    ) -> Result<(Plan, Usage)> {
        let system = prompts::planning(catalog, instructions);
        let schema = plan_schema();
        let mut messages = history.to_vec();
        messages.push(Message::user(message));

        let request = StructuredRequest {
            system: &system,
            messages: &messages,
            name: "plan_steps",
            schema: &schema,
        };
        let response = timed(self.timeout, self.backend.structured(request))
            .await
            .map_err(Error::Planning)?;
        let raw: RawPlan = decode(&response).map_err(Error::Planning)?;

        let plan = Plan::validate(raw.steps, catalog);
        debug!(steps = plan.steps.len(), dropped = plan.dropped.len(), "plan generated");
        Ok((plan, response.usage))
    }
}

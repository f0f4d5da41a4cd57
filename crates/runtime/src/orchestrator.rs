//! One inbound message, end to end.

use crate::engine::{Engine, EngineConfig};
use crate::model::{Backend, Message, ModelRequest, Usage, timed};
use crate::planner::{Plan, Planner};
use crate::prompts;
use crate::selector::{Selection, Selector};
use crate::tools::{ToolCatalog, ToolCategory};
use crate::tracker::{ToolCallRecord, ToolCallTracker};
use crate::Result;
use policy::Policy;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Input for one run.
#[derive(Debug, Clone, Default)]
pub struct OrchestrationRequest {
    pub message: String,
    pub history: Vec<Message>,
    pub categories: Vec<ToolCategory>,
    pub custom_instructions: Option<String>,
}

impl OrchestrationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_categories(mut self, categories: Vec<ToolCategory>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }
}

/// How a run produced its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Answered without tools.
    Direct,
    /// Answered by the execution engine.
    Executed,
}

#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub run_id: Uuid,
    pub outcome: Outcome,
    pub content: String,
    /// Empty for direct answers.
    pub transcript: Vec<Message>,
    /// `None` when tracking is disabled or no tools ran.
    pub tool_calls: Option<Vec<ToolCallRecord>>,
    pub plan: Option<Plan>,
    pub usage: Usage,
}

impl OrchestrationResult {
    fn direct(run_id: Uuid, content: String, usage: Usage) -> Self {
        Self {
            run_id,
            outcome: Outcome::Direct,
            content,
            transcript: Vec::new(),
            tool_calls: None,
            plan: None,
            usage,
        }
    }
}

/// Routes messages through selection, planning and execution.
pub struct Orchestrator<B: Backend> {
    backend: B,
    config: EngineConfig,
    policy: Policy,
    track_tool_calls: bool,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: EngineConfig::default(),
            policy: Policy::default(),
            track_tool_calls: true,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Record every tool call in the result (on by default).
    pub fn track_tool_calls(mut self, enabled: bool) -> Self {
        self.track_tool_calls = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one message.
    ///
    /// On error, [`crate::Error::apology`] gives the text to show the user.
    pub async fn handle(&self, request: &OrchestrationRequest) -> Result<OrchestrationResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("orchestrate", %run_id, categories = request.categories.len());
        self.run(run_id, request).instrument(span).await
    }

    async fn run(
        &self,
        run_id: Uuid,
        request: &OrchestrationRequest,
    ) -> Result<OrchestrationResult> {
        if request.categories.is_empty() {
            return self.answer_directly(run_id, request).await;
        }

        let timeout = self.config.model_timeout();
        let selected = Selector::new(&self.backend, timeout)
            .select(&request.message, &request.history, &request.categories)
            .await?;
        let mut usage = selected.usage;

        let keys = match &selected.selection {
            Selection::None => {
                info!(rationale = %selected.rationale, "answering without tools");
                return Ok(OrchestrationResult::direct(
                    run_id,
                    selected.direct_answer,
                    usage,
                ));
            }
            Selection::Categories(keys) => keys,
        };

        let chosen: Vec<&ToolCategory> = request
            .categories
            .iter()
            .filter(|c| keys.contains(&c.key))
            .collect();
        let catalog = ToolCatalog::from_categories(chosen.iter().copied())?;

        let mut instructions: Vec<String> = chosen
            .iter()
            .filter_map(|c| c.default_instructions.clone())
            .collect();
        instructions.extend(request.custom_instructions.clone());

        let (plan, plan_usage) = Planner::new(&self.backend, timeout)
            .plan(&catalog, &instructions, &request.history, &request.message)
            .await?;
        usage += plan_usage;

        let plan_text = plan.format();
        let system = if chosen.len() > 1 {
            prompts::multi_step(&instructions, &plan_text)
        } else {
            prompts::single_category(&instructions, &plan_text)
        };

        let tracker = ToolCallTracker::new();
        let mut engine = Engine::new(&self.backend, &catalog, self.config).policy(&self.policy);
        if self.track_tool_calls {
            engine = engine.observer(&tracker);
        }
        let execution = engine
            .run(&system, &request.history, &request.message)
            .await?;
        usage += execution.usage;

        info!(
            cycles = execution.cycles,
            tokens = usage.total_tokens(),
            "run complete"
        );

        let records = tracker.into_records();
        Ok(OrchestrationResult {
            run_id,
            outcome: Outcome::Executed,
            content: execution.answer,
            transcript: execution.transcript,
            tool_calls: (!records.is_empty()).then_some(records),
            plan: Some(plan),
            usage,
        })
    }

    async fn answer_directly(
        &self,
        run_id: Uuid,
        request: &OrchestrationRequest,
    ) -> Result<OrchestrationResult> {
        let mut messages = request.history.clone();
        messages.push(Message::user(request.message.as_str()));

        let model_request = ModelRequest {
            system: Some(prompts::DIRECT_PROMPT),
            messages: &messages,
            tools: &[],
        };
        let response = timed(self.config.model_timeout(), self.backend.call(model_request)).await?;

        info!("no tool categories configured, answered directly");
        Ok(OrchestrationResult::direct(
            run_id,
            response.message.text(),
            response.usage,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::model::ModelError;
    use crate::bridge::{BridgeConfig, BridgePool, BridgeSession};
    use crate::testing::{FakeServer, ScriptedBackend, StubTool, calls};
    use serde_json::{Map, json};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn zero_categories_answer_directly() {
        let backend = ScriptedBackend::new().turn(Message::assistant("Hi! How can I help?"));
        let orchestrator = Orchestrator::new(backend);

        let result = orchestrator
            .handle(&OrchestrationRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Direct);
        assert_eq!(result.content, "Hi! How can I help?");
        assert!(result.transcript.is_empty());
        assert!(result.tool_calls.is_none());

        let seen = orchestrator.backend().seen();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].tools.is_empty());
    }

    #[tokio::test]
    async fn none_selection_skips_tools() {
        let tool = Arc::new(StubTool::new("search_issues", "never"));
        let category = ToolCategory::new("jira", "Issue tracking").with_tool(tool.clone());
        let backend = ScriptedBackend::new().structured(json!({
            "categories": ["NONE"],
            "rationale": "greeting",
            "direct_answer": "Good morning!"
        }));
        let orchestrator = Orchestrator::new(backend);

        let result = orchestrator
            .handle(&OrchestrationRequest::new("morning").with_categories(vec![category]))
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Direct);
        assert_eq!(result.content, "Good morning!");
        assert!(result.transcript.is_empty());
        assert_eq!(tool.invocations(), 0);
        assert_eq!(orchestrator.backend().call_count(), 1);
    }

    #[tokio::test]
    async fn single_category_creates_an_issue() {
        let category = ToolCategory::new("jira", "Issue tracking")
            .with_tool(StubTool::shared("create_issue", "Created OPS-42"))
            .with_default_instructions("Default project is OPS");
        let backend = ScriptedBackend::new()
            .structured(json!({"categories": ["jira"], "rationale": "issue", "direct_answer": ""}))
            .structured(json!({"steps": [
                {"kind": "tool", "tool": "create_issue", "args": {"title": "Login broken"}}
            ]}))
            .turn(calls(&[(
                "c1",
                "create_issue",
                json!({"title": "Login broken"}),
            )]))
            .turn(Message::assistant("Created OPS-42 for you."));
        let orchestrator = Orchestrator::new(backend);

        let result = orchestrator
            .handle(
                &OrchestrationRequest::new("file a bug: login broken")
                    .with_categories(vec![category])
                    .with_instructions("Be brief"),
            )
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Executed);
        assert_eq!(result.content, "Created OPS-42 for you.");
        assert_eq!(result.transcript.len(), 4);

        let records = result.tool_calls.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "create_issue");
        assert_eq!(records[0].result.as_deref(), Some("Created OPS-42"));

        let seen = orchestrator.backend().seen();
        let execution_prompt = seen[2].system.as_deref().unwrap();
        assert!(execution_prompt.contains("Suggested approach:\n1. Call create_issue"));
        assert!(execution_prompt.contains("- Default project is OPS\n- Be brief"));
        assert_eq!(seen[2].tools, vec!["create_issue"]);
    }

    #[tokio::test]
    async fn multiple_categories_use_the_plan_prompt() {
        let jira = ToolCategory::new("jira", "Issues")
            .with_tool(StubTool::shared("create_issue", "OPS-7"));
        let github =
            ToolCategory::new("github", "Code").with_tool(StubTool::shared("list_prs", "#12"));
        let wiki =
            ToolCategory::new("wiki", "Docs").with_tool(StubTool::shared("search_docs", "-"));
        let backend = ScriptedBackend::new()
            .structured(json!({
                "categories": ["github", "jira"],
                "rationale": "",
                "direct_answer": ""
            }))
            .structured(json!({"steps": [
                {"kind": "tool", "tool": "list_prs", "args": {}},
                {"kind": "tool", "tool": "search_docs", "args": {}},
                {"kind": "tool", "tool": "create_issue", "args": {}}
            ]}))
            .turn(calls(&[("c1", "list_prs", json!({}))]))
            .turn(calls(&[("c2", "create_issue", json!({"pr": 12}))]))
            .turn(Message::assistant("Filed OPS-7 for PR #12."));
        let orchestrator = Orchestrator::new(backend);

        let request = OrchestrationRequest::new("file an issue for the open PR")
            .with_categories(vec![jira, github, wiki]);
        let result = orchestrator.handle(&request).await.unwrap();

        let plan = result.plan.unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.dropped, vec!["search_docs"]);
        assert_eq!(result.tool_calls.unwrap().len(), 2);

        let seen = orchestrator.backend().seen();
        let execution_prompt = seen[2].system.as_deref().unwrap();
        assert!(execution_prompt.contains("Plan:\n1. Call list_prs\n2. Call create_issue"));
        assert_eq!(seen[2].tools, vec!["create_issue", "list_prs"]);
    }

    #[tokio::test]
    async fn tool_failures_do_not_fail_the_run() {
        let category = ToolCategory::new("jira", "Issues")
            .with_tool(Arc::new(StubTool::failing("create_issue", "HTTP 500")));
        let backend = ScriptedBackend::new()
            .structured(json!({"categories": ["jira"], "rationale": "", "direct_answer": ""}))
            .structured(json!({"steps": []}))
            .turn(calls(&[("c1", "create_issue", json!({}))]))
            .turn(Message::assistant("Jira is having trouble right now."));
        let orchestrator = Orchestrator::new(backend);

        let result = orchestrator
            .handle(&OrchestrationRequest::new("file a bug").with_categories(vec![category]))
            .await
            .unwrap();

        assert_eq!(result.content, "Jira is having trouble right now.");
        let record = &result.tool_calls.unwrap()[0];
        assert_eq!(record.result.as_deref(), Some("execution failed: HTTP 500"));
    }

    #[tokio::test]
    async fn failing_bridge_tool_still_yields_an_answer() {
        let server = FakeServer::new(vec![json!({
            "name": "create_issue",
            "inputSchema": {"type": "object", "properties": {"title": {"type": "string"}}}
        })])
        .reply(
            "create_issue",
            json!({
                "content": [{"type": "text", "text": "project OPS is archived"}],
                "isError": true
            }),
        );
        let pool = BridgePool::new(BridgeConfig::default());
        let session =
            BridgeSession::start("atlassian", server.client("atlassian").await, Map::new())
                .await
                .unwrap();
        pool.adopt(session).await;
        let category = pool.category("atlassian").await.unwrap();

        let backend = ScriptedBackend::new()
            .structured(json!({"categories": ["atlassian"], "rationale": "", "direct_answer": ""}))
            .structured(json!({"steps": []}))
            .turn(calls(&[("c1", "create_issue", json!({"title": "Login broken"}))]))
            .turn(Message::assistant("I couldn't file it: project OPS is archived."));
        let orchestrator = Orchestrator::new(backend);

        let request =
            OrchestrationRequest::new("file a bug: login broken").with_categories(vec![category]);
        let result = orchestrator.handle(&request).await.unwrap();

        assert_eq!(result.outcome, Outcome::Executed);
        assert_eq!(result.content, "I couldn't file it: project OPS is archived.");
        let records = result.tool_calls.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].result.as_deref(),
            Some("execution failed: project OPS is archived")
        );
        assert_eq!(
            server.calls.lock().unwrap()[0],
            ("create_issue".to_string(), json!({"title": "Login broken"}))
        );
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn looping_model_hits_the_cycle_limit() {
        let category = ToolCategory::new("jira", "Issues")
            .with_tool(StubTool::shared("search_issues", "none"));
        let backend = ScriptedBackend::new()
            .structured(json!({"categories": ["jira"], "rationale": "", "direct_answer": ""}))
            .structured(json!({"steps": []}))
            .repeat(calls(&[("c", "search_issues", json!({}))]));
        let orchestrator = Orchestrator::new(backend).with_config(EngineConfig {
            max_cycles: 4,
            ..EngineConfig::default()
        });

        let err = orchestrator
            .handle(&OrchestrationRequest::new("find it").with_categories(vec![category]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CycleLimit { max_cycles: 4 }));
        assert_eq!(err.apology(), crate::error::CYCLE_LIMIT_APOLOGY);
        assert_eq!(orchestrator.backend().call_count(), 2 + 4);
    }

    #[tokio::test]
    async fn selection_failure_is_fatal() {
        let category = ToolCategory::new("jira", "Issues");
        let orchestrator = Orchestrator::new(ScriptedBackend::new());

        let err = orchestrator
            .handle(&OrchestrationRequest::new("hi").with_categories(vec![category]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Selection(ModelError::Api(_))));
        assert_eq!(err.apology(), crate::error::APOLOGY);
    }

    #[tokio::test]
    async fn slow_models_time_out() {
        let backend = ScriptedBackend::new()
            .turn(Message::assistant("too late"))
            .with_delay(Duration::from_secs(5));
        let orchestrator = Orchestrator::new(backend).with_config(EngineConfig {
            model_timeout_secs: 0,
            ..EngineConfig::default()
        });

        let err = orchestrator
            .handle(&OrchestrationRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::Timeout(_))));
    }

    #[tokio::test]
    async fn tracking_can_be_disabled() {
        let category =
            ToolCategory::new("jira", "Issues").with_tool(StubTool::shared("search_issues", "3"));
        let backend = ScriptedBackend::new()
            .structured(json!({"categories": ["jira"], "rationale": "", "direct_answer": ""}))
            .structured(json!({"steps": []}))
            .turn(calls(&[("c", "search_issues", json!({}))]))
            .turn(Message::assistant("3 issues"));
        let orchestrator = Orchestrator::new(backend).track_tool_calls(false);

        let result = orchestrator
            .handle(&OrchestrationRequest::new("count").with_categories(vec![category]))
            .await
            .unwrap();
        assert!(result.tool_calls.is_none());
        assert_eq!(result.content, "3 issues");
    }
}

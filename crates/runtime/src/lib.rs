//! Switchboard runtime: tool-routing orchestration for chat assistants.
//!
//! A message flows through four stages:
//!
//! - **Selection**: the [`Selector`] asks the model which tool categories
//!   the message needs, or answers it directly.
//! - **Planning**: the [`Planner`] drafts an advisory plan over the tools of
//!   the selected categories.
//! - **Execution**: the [`Engine`] runs a bounded model/tool loop, feeding
//!   every tool result (or failure) back to the model.
//! - **Observation**: a [`ToolObserver`] such as [`ToolCallTracker`] records
//!   every tool invocation.
//!
//! The [`Orchestrator`] composes the four. Tools come from in-process
//! [`Tool`] implementations or from MCP servers through the [`bridge`].
//!
//! # Example
//!
//! ```no_run
//! use runtime::bridge::{BridgeConfig, BridgePool};
//! use runtime::{AnthropicAuth, AnthropicBackend, OrchestrationRequest, Orchestrator};
//!
//! # async fn example() -> runtime::Result<()> {
//! let auth = AnthropicAuth::ApiKey("sk-ant-api01-...".into());
//! let backend = AnthropicBackend::builder(auth, "claude-sonnet-4-20250514").build();
//! let orchestrator = Orchestrator::new(backend);
//!
//! let pool = BridgePool::new(BridgeConfig::default());
//! let (categories, _unavailable) = pool.categories().await;
//!
//! let request = OrchestrationRequest::new("What's blocking the release?")
//!     .with_categories(categories);
//! match orchestrator.handle(&request).await {
//!     Ok(result) => println!("{}", result.content),
//!     Err(e) => println!("{}", e.apology()),
//! }
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
mod engine;
mod error;
pub mod model;
mod orchestrator;
mod planner;
pub mod prompts;
mod providers;
mod selector;
pub mod tools;
mod tracker;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineConfig, Execution};
pub use error::{APOLOGY, BridgeError, CYCLE_LIMIT_APOLOGY, Error, Result};
pub use model::{Backend, Message, ModelError, Role, ToolCall, ToolOutcome, Usage};
pub use orchestrator::{OrchestrationRequest, OrchestrationResult, Orchestrator, Outcome};
pub use planner::{Plan, PlanStep, Planner};
pub use providers::{AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder};
pub use selector::{NONE_KEY, Selection, SelectionResult, Selector};
pub use tools::{SharedTool, Tool, ToolCatalog, ToolCategory, ToolDescriptor, ToolError};
pub use tracker::{
    MAX_RESULT_CHARS, NoopObserver, TRUNCATION_MARKER, ToolCallRecord, ToolCallTracker,
    ToolObserver, truncate_result,
};

//! Tool call observation.
//!
//! The engine reports every invocation to a [`ToolObserver`] injected for
//! the run. [`ToolCallTracker`] is the recording implementation; a fresh one
//! is created per run so concurrent runs never share a log.

use crate::model::ToolOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Longest result kept in a record, in characters.
pub const MAX_RESULT_CHARS: usize = 1000;

/// Appended to results cut at [`MAX_RESULT_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Receives tool invocation events from the engine.
///
/// `run_id` identifies one invocation. Implementations must not block.
pub trait ToolObserver: Send + Sync {
    fn on_tool_start(&self, run_id: Uuid, name: &str, args: &Value);

    fn on_tool_end(&self, run_id: Uuid, outcome: &ToolOutcome);
}

/// Observer that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ToolObserver for NoopObserver {
    fn on_tool_start(&self, _run_id: Uuid, _name: &str, _args: &Value) {}

    fn on_tool_end(&self, _run_id: Uuid, _outcome: &ToolOutcome) {}
}

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub run_id: Uuid,
    pub name: String,
    pub args: Value,
    /// Truncated textual result; `None` until the call ends, and for
    /// non-textual results.
    pub result: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Records every tool call of one run.
#[derive(Debug, Default)]
pub struct ToolCallTracker {
    records: Mutex<Vec<ToolCallRecord>>,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records, in start order.
    pub fn records(&self) -> Vec<ToolCallRecord> {
        self.lock().clone()
    }

    pub fn into_records(self) -> Vec<ToolCallRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // A panic elsewhere must not disable recording.
    fn lock(&self) -> MutexGuard<'_, Vec<ToolCallRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ToolObserver for ToolCallTracker {
    fn on_tool_start(&self, run_id: Uuid, name: &str, args: &Value) {
        self.lock().push(ToolCallRecord {
            run_id,
            name: name.to_string(),
            args: args.clone(),
            result: None,
            started_at: Utc::now(),
            finished_at: None,
        });
    }

    fn on_tool_end(&self, run_id: Uuid, outcome: &ToolOutcome) {
        let mut records = self.lock();
        let Some(record) = records.iter_mut().find(|r| r.run_id == run_id) else {
            return;
        };
        record.result = outcome.as_text().map(truncate_result);
        record.finished_at = Some(Utc::now());
    }
}

/// Cut `text` to [`MAX_RESULT_CHARS`] characters, marking the cut.
pub fn truncate_result(text: &str) -> String {
    match text.char_indices().nth(MAX_RESULT_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

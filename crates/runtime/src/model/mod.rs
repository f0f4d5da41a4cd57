//! LLM protocol types and backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, Message, ModelRequest, ModelResponse, Part, Role, StructuredRequest,
    StructuredResponse, ToolCall, ToolOutcome, ToolResult, ToolSpec, Usage,
};

use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// Bound a model call by `limit`.
pub(crate) async fn timed<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ModelError>>,
) -> Result<T, ModelError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ModelError::Timeout(limit))?
}

/// Decode a structured response into `T`.
pub(crate) fn decode<T: DeserializeOwned>(response: &StructuredResponse) -> Result<T, ModelError> {
    serde_json::from_value(response.value.clone())
        .map_err(|e| ModelError::InvalidResponse(format!("schema mismatch: {e}")))
}

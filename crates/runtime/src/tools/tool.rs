//! Tool trait.

use super::{ToolDescriptor, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// An invocable tool.
///
/// Implementations describe themselves once and are then invoked with the
/// JSON arguments proposed by the model. This is the boundary between the
/// model loop and side effects.
#[async_trait]
pub trait Tool: Send + Sync {
    fn describe(&self) -> &ToolDescriptor;

    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}

/// Type alias for a shared tool reference.
pub type SharedTool = Arc<dyn Tool>;

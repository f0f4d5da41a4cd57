//! Tool descriptors.

use crate::model::ToolSpec;
use policy::SideEffect;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static description of one invocable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within a run.
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
    pub side_effect: SideEffect,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        side_effect: SideEffect,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            side_effect,
        }
    }

    /// The definition handed to the model.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            schema: self.parameters.clone(),
        }
    }
}

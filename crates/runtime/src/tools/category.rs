//! Tool categories.

use super::SharedTool;
use std::fmt;

/// A group of tools offered by one provider, plus the text the selector
/// uses to decide whether the group is relevant.
#[derive(Clone)]
pub struct ToolCategory {
    pub key: String,
    pub tools: Vec<SharedTool>,
    pub selection_prompt: String,
    pub default_instructions: Option<String>,
}

impl ToolCategory {
    pub fn new(key: impl Into<String>, selection_prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tools: Vec::new(),
            selection_prompt: selection_prompt.into(),
            default_instructions: None,
        }
    }

    pub fn with_tool(mut self, tool: SharedTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = SharedTool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_default_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.default_instructions = Some(instructions.into());
        self
    }

    /// Names of the tools in this category, in order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .map(|t| t.describe().name.as_str())
            .collect()
    }
}

impl fmt::Debug for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCategory")
            .field("key", &self.key)
            .field("tools", &self.tool_names())
            .field("default_instructions", &self.default_instructions)
            .finish_non_exhaustive()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a tool does to the system it talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    Read,
    Create,
    Update,
    Delete,
}

impl SideEffect {
    pub const ALL: [SideEffect; 4] = [
        SideEffect::Read,
        SideEffect::Create,
        SideEffect::Update,
        SideEffect::Delete,
    ];

    /// Whether the effect changes remote state.
    pub fn is_mutation(self) -> bool {
        !matches!(self, SideEffect::Read)
    }
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SideEffect::Read => "read",
            SideEffect::Create => "create",
            SideEffect::Update => "update",
            SideEffect::Delete => "delete",
        };
        f.pad(s)
    }
}

/// A request to invoke one tool.
#[derive(Debug, Clone)]
pub struct ToolRequest<'a> {
    pub tool: &'a str,
    pub effect: SideEffect,
}

impl<'a> ToolRequest<'a> {
    pub fn new(tool: &'a str, effect: SideEffect) -> Self {
        Self { tool, effect }
    }
}

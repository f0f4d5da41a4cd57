//! Policy configuration and enforcement.

use crate::{Error, Result, SideEffect, ToolRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Policy configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Side effects tools may perform.
    #[serde(default = "all_effects")]
    pub allow: BTreeSet<SideEffect>,

    /// Tools that are always refused, whatever their effect.
    #[serde(default)]
    pub deny_tools: Vec<String>,
}

fn all_effects() -> BTreeSet<SideEffect> {
    SideEffect::ALL.into_iter().collect()
}

impl Default for Policy {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Result of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Policy {
    /// Load policy from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Allow every side effect.
    pub fn permissive() -> Self {
        Self {
            allow: all_effects(),
            deny_tools: Vec::new(),
        }
    }

    /// Allow only tools that read.
    pub fn read_only() -> Self {
        Self {
            allow: BTreeSet::from([SideEffect::Read]),
            deny_tools: Vec::new(),
        }
    }

    /// Check if a tool invocation is allowed.
    pub fn check(&self, request: &ToolRequest<'_>) -> Decision {
        if self.deny_tools.iter().any(|t| t == request.tool) {
            return Decision::Deny {
                reason: format!("tool {} is denied by policy", request.tool),
            };
        }

        if self.allow.contains(&request.effect) {
            Decision::Allow
        } else {
            Decision::Deny {
                reason: format!(
                    "{} effect of tool {} is not allowed",
                    request.effect, request.tool
                ),
            }
        }
    }
}

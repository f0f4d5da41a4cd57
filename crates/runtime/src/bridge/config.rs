//! Bridge configuration.

use mcp::ServerConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Category text for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// What the selector is told about this provider's tools.
    #[serde(default)]
    pub selection_prompt: Option<String>,
    #[serde(default)]
    pub default_instructions: Option<String>,
}

/// Every tool provider the bridge may connect to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub providers: Vec<ServerConfig>,

    /// Provider name to parameter defaults.
    #[serde(default)]
    pub defaults: HashMap<String, Map<String, Value>>,

    /// Integration name to the provider serving it.
    #[serde(default)]
    pub integrations: HashMap<String, String>,

    #[serde(default)]
    pub categories: HashMap<String, CategoryConfig>,
}

impl BridgeConfig {
    /// The provider config for `name`, which may be an integration alias.
    pub fn provider(&self, name: &str) -> Option<&ServerConfig> {
        let name = self.integrations.get(name).map_or(name, String::as_str);
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn defaults_for(&self, provider: &str) -> Map<String, Value> {
        self.defaults.get(provider).cloned().unwrap_or_default()
    }

    pub fn category_for(&self, provider: &str) -> CategoryConfig {
        self.categories.get(provider).cloned().unwrap_or_default()
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name.as_str())
    }
}

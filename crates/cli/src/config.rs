//! Configuration loading from switchboard.toml.

use policy::Policy;
use runtime::bridge::BridgeConfig;
use runtime::{AnthropicAuth, AnthropicBackend, EngineConfig};
use serde::Deserialize;
use std::path::Path;

const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Loop bounds and timeouts.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Side effects tools may perform.
    #[serde(default)]
    pub policy: Policy,

    /// Tool providers, their defaults and category text.
    #[serde(flatten)]
    pub bridge: BridgeConfig,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Standard Anthropic API key (sk-ant-api01-...).
    /// Falls back to `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,

    /// Bearer token for gateways. Mutually exclusive with api_key.
    pub bearer_token: Option<String>,

    /// Override for the messages endpoint.
    pub base_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
            bearer_token: None,
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the authentication from config, then the environment.
    pub fn auth(&self) -> Result<AnthropicAuth, ConfigError> {
        self.auth_with(std::env::var(API_KEY_VAR).ok())
    }

    fn auth_with(&self, env_key: Option<String>) -> Result<AnthropicAuth, ConfigError> {
        match (&self.backend.api_key, &self.backend.bearer_token) {
            (Some(key), None) => Ok(AnthropicAuth::ApiKey(key.clone())),
            (None, Some(token)) => Ok(AnthropicAuth::Bearer(token.clone())),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousAuth),
            (None, None) => env_key
                .filter(|k| !k.is_empty())
                .map(AnthropicAuth::ApiKey)
                .ok_or(ConfigError::MissingAuth),
        }
    }

    pub fn backend(&self) -> Result<AnthropicBackend, ConfigError> {
        let mut builder = AnthropicBackend::builder(self.auth()?, &self.backend.model)
            .max_tokens(self.backend.max_tokens);
        if let Some(url) = &self.backend.base_url {
            builder = builder.base_url(url);
        }
        Ok(builder.build())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("authentication not configured: set backend.api_key or {API_KEY_VAR}")]
    MissingAuth,

    #[error(
        "ambiguous authentication: set either backend.api_key OR backend.bearer_token, not both"
    )]
    AmbiguousAuth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::{SideEffect, ToolRequest};

    const FULL: &str = r#"
[backend]
model = "claude-test"
api_key = "sk-ant-test"

[engine]
max_cycles = 6

[policy]
allow = ["read", "create"]

[[providers]]
name = "atlassian"
transport = "stdio"
command = "atlassian-mcp"

[defaults.atlassian]
project = "OPS"

[integrations]
jira = "atlassian"

[categories.atlassian]
selection_prompt = "Jira issues"
"#;

    #[test]
    fn parses_every_section() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.backend.model, "claude-test");
        assert_eq!(config.engine.max_cycles, 6);
        assert_eq!(config.engine.tool_timeout_secs, EngineConfig::default().tool_timeout_secs);
        assert!(!config
            .policy
            .check(&ToolRequest::new("delete_issue", SideEffect::Delete))
            .is_allowed());
        assert_eq!(config.bridge.provider("jira").unwrap().name, "atlassian");
        assert!(matches!(config.auth().unwrap(), AnthropicAuth::ApiKey(k) if k == "sk-ant-test"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.model, default_model());
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.policy, Policy::permissive());
        assert!(config.bridge.providers.is_empty());
    }

    #[test]
    fn auth_falls_back_to_environment() {
        let config = Config::default();
        assert!(matches!(
            config.auth_with(Some("sk-env".into())).unwrap(),
            AnthropicAuth::ApiKey(k) if k == "sk-env"
        ));
        assert!(matches!(
            config.auth_with(None),
            Err(ConfigError::MissingAuth)
        ));
    }

    #[test]
    fn both_credentials_are_ambiguous() {
        let config = Config::parse(
            r#"
[backend]
api_key = "a"
bearer_token = "b"
"#,
        )
        .unwrap();
        assert!(matches!(config.auth_with(None), Err(ConfigError::AmbiguousAuth)));
    }
}

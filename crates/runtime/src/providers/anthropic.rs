//! Anthropic API backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, StructuredRequest,
    StructuredResponse, ToolCall, ToolSpec, Usage,
};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Authentication mode for Anthropic API.
#[derive(Debug, Clone)]
pub enum AnthropicAuth {
    /// Standard API key authentication.
    ApiKey(String),
    /// Bearer token, e.g. issued by a gateway.
    Bearer(String),
}

impl std::fmt::Display for AnthropicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "api_key"),
            Self::Bearer(_) => write!(f, "bearer"),
        }
    }
}

impl AnthropicAuth {
    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => req.header("x-api-key", key),
            Self::Bearer(token) => req.bearer_auth(token),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ApiToolChoice<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiToolChoice<'a> {
    #[serde(rename = "type")]
    choice_type: &'static str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(usage: ApiUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    auth: AnthropicAuth,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicBackendBuilder {
    pub fn new(auth: AnthropicAuth, model: impl Into<String>) -> Self {
        Self {
            auth,
            model: model.into(),
            max_tokens: 4096,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Messages endpoint to post to, for proxies and gateways.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            auth: self.auth,
            model: self.model,
            max_tokens: self.max_tokens,
            url: self.base_url,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    auth: AnthropicAuth,
    model: String,
    max_tokens: u32,
    url: String,
}

impl AnthropicBackend {
    pub fn builder(auth: AnthropicAuth, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(auth, model)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User | Role::System | Role::Tool => "user",
            Role::Assistant => "assistant",
        }
    }

    fn part_to_api(part: &Part) -> ApiContentBlock {
        match part {
            Part::Text(text) => ApiContentBlock::Text { text: text.clone() },
            Part::ToolCall(call) => ApiContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            },
            Part::ToolResult(result) => ApiContentBlock::ToolResult {
                tool_use_id: result.tool_call_id.clone(),
                content: result.outcome.render(),
                is_error: result.outcome.is_error(),
            },
        }
    }

    /// Convert a transcript to API messages.
    ///
    /// The API wants every result of one assistant turn in a single user
    /// message, so consecutive tool messages are merged.
    fn messages_to_api(messages: &[Message]) -> Vec<ApiMessage> {
        let mut out: Vec<ApiMessage> = Vec::with_capacity(messages.len());
        for msg in messages.iter().filter(|m| m.role != Role::System) {
            let blocks: Vec<ApiContentBlock> = msg.parts.iter().map(Self::part_to_api).collect();

            if msg.role == Role::Tool
                && let Some(ApiMessage {
                    role: "user",
                    content: ApiContent::Blocks(previous),
                }) = out.last_mut()
                && previous
                    .iter()
                    .all(|b| matches!(b, ApiContentBlock::ToolResult { .. }))
            {
                previous.extend(blocks);
                continue;
            }

            let content = match (msg.role, msg.parts.as_slice()) {
                (Role::User | Role::Assistant, [Part::Text(text)]) => {
                    ApiContent::Text(text.clone())
                }
                _ => ApiContent::Blocks(blocks),
            };
            out.push(ApiMessage {
                role: Self::role_to_api(msg.role),
                content,
            });
        }
        out
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.schema.clone(),
        }
    }

    fn response_to_message(blocks: Vec<ApiResponseBlock>) -> Message {
        let parts: Vec<Part> = blocks
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(Part::Text(text)),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    Some(Part::ToolCall(ToolCall { id, name, input }))
                }
                ApiResponseBlock::Unknown => None,
            })
            .collect();

        Message {
            role: Role::Assistant,
            parts,
        }
    }

    async fn send(&self, request: &ApiRequest<'_>) -> Result<ApiResponse, ModelError> {
        let req = self
            .client
            .post(&self.url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json");

        let response = self
            .auth
            .apply_headers(req)
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({}, auth={})", self.model, self.auth)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: Self::messages_to_api(request.messages),
            system: request.system,
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            tool_choice: None,
        };

        let api_response = self.send(&api_request).await?;
        Ok(ModelResponse {
            message: Self::response_to_message(api_response.content),
            usage: api_response.usage.into(),
        })
    }

    async fn structured(
        &self,
        request: StructuredRequest<'_>,
    ) -> Result<StructuredResponse, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: Self::messages_to_api(request.messages),
            system: Some(request.system),
            tools: vec![ApiTool {
                name: request.name.to_string(),
                description: format!("Record the {} result.", request.name),
                input_schema: request.schema.clone(),
            }],
            tool_choice: Some(ApiToolChoice {
                choice_type: "tool",
                name: request.name,
            }),
        };

        let api_response = self.send(&api_request).await?;
        let value = api_response
            .content
            .into_iter()
            .find_map(|block| match block {
                ApiResponseBlock::ToolUse { name, input, .. } if name == request.name => {
                    Some(input)
                }
                _ => None,
            })
            .ok_or_else(|| {
                ModelError::InvalidResponse(format!("no {} tool use in response", request.name))
            })?;

        debug!(name = request.name, "structured response received");
        Ok(StructuredResponse {
            value,
            usage: api_response.usage.into(),
        })
    }
}

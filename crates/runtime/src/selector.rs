//! Tool category selection.

use crate::model::{Backend, Message, StructuredRequest, Usage, decode, timed};
use crate::prompts;
use crate::tools::ToolCategory;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Sentinel the model picks when no tools are needed.
pub const NONE_KEY: &str = "NONE";

/// Which categories a message needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Answer directly, without tools.
    None,
    /// A non-empty set of category keys.
    Categories(BTreeSet<String>),
}

impl Selection {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn keys(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::None => None,
            Self::Categories(keys) => Some(keys),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub selection: Selection,
    pub rationale: String,
    /// The reply to send when `selection` is [`Selection::None`].
    pub direct_answer: String,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
struct RawSelection {
    categories: Vec<String>,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    direct_answer: String,
}

/// Picks the tool categories relevant to a message.
pub struct Selector<'a, B: Backend> {
    backend: &'a B,
    timeout: Duration,
}

impl<'a, B: Backend> Selector<'a, B> {
    pub fn new(backend: &'a B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn select(
        &self,
        message: &str,
        history: &[Message],
        categories: &[ToolCategory],
    ) -> Result<SelectionResult> {
        if categories.is_empty() {
            return Err(Error::InvalidInput("no tool categories to select from".into()));
        }

        let system = prompts::selection(categories);
        let schema = selection_schema(categories);
        let mut messages = history.to_vec();
        messages.push(Message::user(message));

        let request = StructuredRequest {
            system: &system,
            messages: &messages,
            name: "select_categories",
            schema: &schema,
        };
        let response = timed(self.timeout, self.backend.structured(request))
            .await
            .map_err(Error::Selection)?;
        let raw: RawSelection = decode(&response).map_err(Error::Selection)?;

        let selection = resolve(raw.categories, categories);
        debug!(?selection, rationale = %raw.rationale, "categories selected");

        Ok(SelectionResult {
            selection,
            rationale: raw.rationale,
            direct_answer: raw.direct_answer,
            usage: response.usage,
        })
    }
}

/// Output schema with the category keys as a closed enum.
pub fn selection_schema(categories: &[ToolCategory]) -> Value {
    let mut keys: Vec<&str> = categories.iter().map(|c| c.key.as_str()).collect();
    keys.push(NONE_KEY);

    json!({
        "type": "object",
        "properties": {
            "categories": {
                "type": "array",
                "items": {"type": "string", "enum": keys},
                "description": "Keys of the categories needed, or only NONE."
            },
            "rationale": {"type": "string"},
            "direct_answer": {
                "type": "string",
                "description": "Full reply when NONE is selected, otherwise empty."
            }
        },
        "required": ["categories", "rationale", "direct_answer"]
    })
}

// Unknown keys are discarded; NONE only wins when nothing else remains.
fn resolve(picked: Vec<String>, categories: &[ToolCategory]) -> Selection {
    let mut keys = BTreeSet::new();
    for key in picked {
        if key == NONE_KEY {
            continue;
        }
        if categories.iter().any(|c| c.key == key) {
            keys.insert(key);
        } else {
            warn!(key = %key, "model selected an unknown category");
        }
    }

    if keys.is_empty() {
        Selection::None
    } else {
        Selection::Categories(keys)
    }
}

//! Sessions shared across runs.

use super::config::BridgeConfig;
use super::session::BridgeSession;
use super::tool::BridgeTool;
use crate::error::BridgeError;
use crate::tools::{SharedTool, ToolCategory};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One provider's session. Callers racing to connect the same provider wait
/// here instead of on the whole pool.
type Slot = Arc<Mutex<Option<Arc<BridgeSession>>>>;

/// Lazily connected provider sessions.
///
/// The only state shared between concurrent runs. A session is created on
/// first use and kept until [`BridgePool::close`] or
/// [`BridgePool::shutdown`]. The pool lock is only held to find a provider's
/// slot, never across a connect.
pub struct BridgePool {
    config: BridgeConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl BridgePool {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn slot(&self, provider: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(provider.to_string()).or_default())
    }

    /// Register an already connected session under its provider name.
    pub async fn adopt(&self, session: BridgeSession) -> Arc<BridgeSession> {
        let session = Arc::new(session);
        let slot = self.slot(session.provider()).await;
        let previous = slot.lock().await.replace(Arc::clone(&session));
        if let Some(previous) = previous {
            previous.close().await;
        }
        session
    }

    /// The session for a provider or integration name, connecting on first
    /// use.
    pub async fn session(&self, name: &str) -> Result<Arc<BridgeSession>, BridgeError> {
        let Some(provider) = self.config.provider(name) else {
            let slot = self.slots.lock().await.get(name).cloned();
            let session = match slot {
                Some(slot) => slot.lock().await.clone(),
                None => None,
            };
            return session
                .filter(|s| !s.is_closed())
                .ok_or_else(|| BridgeError::UnknownProvider(name.to_string()));
        };

        let slot = self.slot(&provider.name).await;
        let mut current = slot.lock().await;
        if let Some(session) = current.as_ref()
            && !session.is_closed()
        {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(
            BridgeSession::connect(provider, self.config.defaults_for(&provider.name)).await?,
        );
        *current = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The tool category a provider contributes.
    pub async fn category(&self, name: &str) -> Result<ToolCategory, BridgeError> {
        let session = self.session(name).await?;
        let text = self.config.category_for(session.provider());

        let selection_prompt = text
            .selection_prompt
            .unwrap_or_else(|| format!("Tools from {}", session.provider()));
        let tools = BridgeTool::all(&session)
            .into_iter()
            .map(|tool| Arc::new(tool) as SharedTool);

        let mut category =
            ToolCategory::new(session.provider(), selection_prompt).with_tools(tools);
        category.default_instructions = text.default_instructions;
        Ok(category)
    }

    /// Categories for every configured provider.
    ///
    /// A provider that fails to connect is reported and skipped; the others
    /// are still returned.
    pub async fn categories(&self) -> (Vec<ToolCategory>, Vec<BridgeError>) {
        let names: Vec<&str> = self.config.provider_names().collect();
        let results = join_all(names.iter().map(|name| self.category(name))).await;

        let mut categories = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(category) => categories.push(category),
                Err(e) => {
                    warn!(provider = e.provider(), error = %e, "tool provider unavailable");
                    errors.push(e);
                }
            }
        }
        (categories, errors)
    }

    /// Close and forget one provider's session.
    pub async fn close(&self, name: &str) {
        let provider = self
            .config
            .provider(name)
            .map_or(name, |config| config.name.as_str());
        let slot = self.slots.lock().await.remove(provider);
        if let Some(slot) = slot {
            let session = slot.lock().await.take();
            if let Some(session) = session {
                session.close().await;
            }
        }
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        let slots: Vec<Slot> = self.slots.lock().await.drain().map(|(_, s)| s).collect();
        info!(providers = slots.len(), "shutting down tool bridge");
        join_all(slots.iter().map(|slot| async move {
            let session = slot.lock().await.take();
            if let Some(session) = session {
                session.close().await;
            }
        }))
        .await;
    }
}

//! Server state management.

use std::collections::HashMap;
use std::sync::Arc;

use confab_core::config::MultiChatConfig;
use confab_core::error::ConfabResult;
use confab_core::types::Message;
use confab_core::{ChatContext, MultiChat};
use tokio::sync::RwLock;

use crate::factory::create_multi_chat;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<MultiChat>,
    /// Working conversation of each caller, replaced by history loads.
    histories: Arc<RwLock<HashMap<String, Vec<Message>>>>,
    /// Bearer key required on every request, when set.
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Create state around a ready chat layer.
    pub fn new(chat: MultiChat) -> Self {
        Self {
            chat: Arc::new(chat),
            histories: Arc::new(RwLock::new(HashMap::new())),
            api_key: None,
        }
    }

    /// Build the chat layer from configuration.
    pub async fn from_config(config: &MultiChatConfig) -> ConfabResult<Self> {
        let chat = create_multi_chat(config).await?;
        Ok(Self::new(chat))
    }

    /// Require `key` as bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key: String = key.into();
        self.api_key = (!key.is_empty()).then(|| Arc::from(key));
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// A context for `user_id` carrying their working history.
    pub async fn context(&self, user_id: &str, text: impl Into<String>) -> ChatContext {
        let history = self
            .histories
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        ChatContext::new(user_id, text).with_history(history)
    }

    /// Keep the context's history as the caller's working history.
    pub async fn save_history(&self, ctx: ChatContext) {
        self.histories.write().await.insert(ctx.user_id, ctx.history);
    }

    /// The caller's working history.
    pub async fn history(&self, user_id: &str) -> Vec<Message> {
        self.histories
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

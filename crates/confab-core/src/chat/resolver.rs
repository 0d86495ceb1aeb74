//! Find or create the active default chat for a turn.

use serde_json::Map;
use std::sync::Arc;

use crate::chat::locks::UserLocks;
use crate::chat::sessions::SessionStore;
use crate::chat::ChatContext;
use crate::config::ChatSettings;
use crate::error::ConfabResult;
use crate::types::ChatSession;

#[derive(Clone)]
pub struct SessionResolver {
    sessions: SessionStore,
    locks: Arc<UserLocks>,
    settings: Arc<ChatSettings>,
}

impl SessionResolver {
    pub fn new(sessions: SessionStore, locks: Arc<UserLocks>, settings: Arc<ChatSettings>) -> Self {
        Self {
            sessions,
            locks,
            settings,
        }
    }

    /// Bind the context to a chat when it carries none.
    ///
    /// Reuses the user's earliest default-named chat or creates one. Store
    /// failures are logged and leave `chat_id` unset.
    pub async fn resolve(&self, ctx: &mut ChatContext) -> Option<String> {
        if ctx.chat_id.is_some() {
            return ctx.chat_id.clone();
        }

        match self.find_or_create(&ctx.user_id).await {
            Ok(chat_id) => {
                ctx.chat_id = Some(chat_id.clone());
                Some(chat_id)
            }
            Err(e) => {
                tracing::error!(user_id = %ctx.user_id, error = %e, "Failed to resolve chat session");
                None
            }
        }
    }

    async fn find_or_create(&self, user_id: &str) -> ConfabResult<String> {
        let _guard = self.locks.acquire(user_id).await;
        self.sessions.ensure_collection().await?;

        if let Some(existing) = self.sessions.find_default(user_id).await? {
            tracing::debug!(user_id, chat_id = %existing.id, "Reusing default chat");
            return Ok(existing.id);
        }

        let default_name = self.settings.default_chat_name.as_str();
        let metadata = ChatSession::new_metadata(user_id, None, Map::new(), default_name);
        let created = self.sessions.insert(default_name, metadata).await?;
        tracing::info!(user_id, chat_id = %created.id, "Chat created (first chat)");
        Ok(created.id)
    }
}

//! Explicit session management: create, rename, delete, list, export.

use backon::Retryable;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

use crate::chat::episodic::EpisodicStore;
use crate::chat::history::HistoryReconstructor;
use crate::chat::locks::UserLocks;
use crate::chat::sessions::{listing_filter, SessionStore};
use crate::chat::ChatContext;
use crate::config::{ChatSettings, RetryPolicy};
use crate::error::{ConfabError, ConfabResult};
use crate::traits::VectorStore;
use crate::types::{
    ChatExport, ChatSession, EpisodicRecord, MemoryPoint, PointList, PointSummary,
};

/// Body of a create request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateChatRequest {
    /// Text to embed; falls back to the chat name when blank.
    #[serde(default)]
    pub content: Option<String>,
    /// Extra metadata merged into the session record.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Run an idempotent store write, retrying transient failures.
async fn with_store_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, write: F) -> ConfabResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ConfabResult<T>>,
{
    write
        .retry(policy.backoff())
        .when(ConfabError::is_transient)
        .notify(|err, dur| {
            tracing::warn!("{} failed, retrying in {:?}: {}", operation, dur, err);
        })
        .await
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn VectorStore>,
    sessions: SessionStore,
    episodic: EpisodicStore,
    history: HistoryReconstructor,
    locks: Arc<UserLocks>,
    settings: Arc<ChatSettings>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn VectorStore>,
        sessions: SessionStore,
        episodic: EpisodicStore,
        history: HistoryReconstructor,
        locks: Arc<UserLocks>,
        settings: Arc<ChatSettings>,
    ) -> Self {
        Self {
            store,
            sessions,
            episodic,
            history,
            locks,
            settings,
        }
    }

    /// Create a chat for `user_id`, enforcing the per-user cap.
    pub async fn create(&self, user_id: &str, request: CreateChatRequest) -> ConfabResult<MemoryPoint> {
        let _guard = self.locks.acquire(user_id).await;
        self.sessions.ensure_collection().await?;

        let metadata = ChatSession::new_metadata(
            user_id,
            request.content.as_deref(),
            request.metadata,
            &self.settings.default_chat_name,
        );

        if !self.settings.unlimited() {
            let active = self.sessions.active_for(user_id).await?.len();
            if active as i64 >= self.settings.max_chats {
                tracing::debug!(user_id, active, "Chat cap reached");
                return Err(ConfabError::CapacityExceeded {
                    max_chats: self.settings.max_chats,
                });
            }
        }

        let content = metadata
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or(self.settings.default_chat_name.as_str())
            .to_string();
        let session = self.sessions.insert(&content, metadata).await?;
        tracing::info!(user_id, chat_id = %session.id, "Chat created");
        Ok(session.into_point())
    }

    /// Rename a chat owned by `user_id`.
    ///
    /// Only `name` changes; content, vector and all other metadata stay.
    pub async fn try_rename(&self, user_id: &str, chat_id: &str, name: &str) -> ConfabResult<ChatSession> {
        let _guard = self.locks.acquire(user_id).await;
        self.sessions.ensure_collection().await?;

        let mut session = self
            .sessions
            .get(chat_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| ConfabError::not_found(chat_id))?;
        if session.source() != user_id {
            return Err(ConfabError::forbidden(format!(
                "chat '{}' is not owned by '{}'",
                chat_id, user_id
            )));
        }

        session.set_name(name);
        let sessions = &self.sessions;
        let session_ref = &session;
        with_store_retry(&self.settings.store_retry, "rename", move || async move {
            sessions.overwrite(session_ref).await
        })
        .await?;
        tracing::info!(user_id, chat_id, name, "Chat renamed");
        Ok(session)
    }

    /// Rename, reporting only success.
    pub async fn rename(&self, user_id: &str, chat_id: &str, name: &str) -> bool {
        match self.try_rename(user_id, chat_id, name).await {
            Ok(_) => true,
            Err(e @ (ConfabError::NotFound { .. } | ConfabError::Forbidden { .. })) => {
                tracing::debug!(user_id, chat_id, reason = %e, "Rename refused");
                false
            }
            Err(e) => {
                tracing::error!(user_id, chat_id, error = %e, "Rename failed");
                false
            }
        }
    }

    /// Delete a chat and, unless soft delete is on, its episodic records.
    ///
    /// Ownership is not checked. Any failure yields `false`.
    pub async fn delete(&self, user_id: &str, chat_id: &str) -> bool {
        match self.try_delete(user_id, chat_id).await {
            Ok(()) => true,
            Err(ConfabError::NotFound { .. }) => {
                tracing::debug!(user_id, chat_id, "Delete of unknown chat");
                false
            }
            Err(e) => {
                tracing::error!(user_id, chat_id, error = %e, "Delete failed");
                false
            }
        }
    }

    async fn try_delete(&self, user_id: &str, chat_id: &str) -> ConfabResult<()> {
        let _guard = self.locks.acquire(user_id).await;
        self.sessions.ensure_collection().await?;

        let mut session = self
            .sessions
            .get(chat_id)
            .await?
            .ok_or_else(|| ConfabError::not_found(chat_id))?;
        let policy = &self.settings.store_retry;
        let sessions = &self.sessions;

        if self.settings.soft_delete {
            if session.is_deleted() {
                return Err(ConfabError::not_found(chat_id));
            }
            session.set_deleted(true);
            let session_ref = &session;
            with_store_retry(policy, "soft delete", move || async move {
                sessions.overwrite(session_ref).await
            })
            .await?;
            tracing::info!(user_id, chat_id, "Chat marked deleted");
            return Ok(());
        }

        with_store_retry(policy, "delete chat", || sessions.remove(chat_id)).await?;

        let episodic = &self.episodic;
        if self
            .store
            .collection_exists(episodic.collection())
            .await?
        {
            with_store_retry(policy, "delete chat records", || {
                episodic.delete_for_chat(user_id, chat_id)
            })
            .await?;
        }
        tracing::info!(user_id, chat_id, "Chat deleted");
        Ok(())
    }

    /// Points of `collection` whose `source` is `user_id` and whose
    /// `deleted` flag is explicitly `false`.
    pub async fn list_by_metadata(&self, user_id: &str, collection: &str) -> ConfabResult<PointList> {
        if collection == self.sessions.collection() {
            self.sessions.ensure_collection().await?;
        }
        if !self.store.collection_exists(collection).await? {
            return Err(ConfabError::collection_not_found(collection));
        }

        let records = self
            .store
            .scroll_all(
                collection,
                Some(&listing_filter(user_id)),
                self.settings.scroll_page_size,
            )
            .await?;
        Ok(PointList::new(
            records.into_iter().map(PointSummary::from).collect(),
        ))
    }

    /// Messages of one chat in `collection`; replaces the context history.
    pub async fn messages_by_metadata(
        &self,
        ctx: &mut ChatContext,
        collection: &str,
        chat_id: Option<&str>,
    ) -> ConfabResult<PointList> {
        let (records, messages) = self.history.load(collection, &ctx.user_id, chat_id).await?;
        ctx.history = messages;
        Ok(PointList::new(records.iter().map(EpisodicRecord::summary).collect()))
    }

    /// A chat's ordered messages plus its name; replaces the context history.
    pub async fn export(&self, ctx: &mut ChatContext, chat_id: &str) -> ConfabResult<ChatExport> {
        self.sessions.ensure_collection().await?;
        let session = self
            .sessions
            .get(chat_id)
            .await?
            .ok_or_else(|| ConfabError::not_found(chat_id))?;

        let (records, messages) = if self
            .store
            .collection_exists(self.episodic.collection())
            .await?
        {
            self.history
                .load(self.episodic.collection(), &ctx.user_id, Some(chat_id))
                .await?
        } else {
            (Vec::new(), Vec::new())
        };
        ctx.history = messages;

        let points: Vec<PointSummary> = records.iter().map(EpisodicRecord::summary).collect();
        Ok(ChatExport {
            messages: PointList {
                count: points.len(),
                points,
                message: None,
            },
            name: Some(session.name().to_string()),
        })
    }
}

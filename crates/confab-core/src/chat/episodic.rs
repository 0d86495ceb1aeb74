//! Episodic store: one record per user turn, tagged with its chat.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::chat::sessions::ensure_collection;
use crate::chat::ChatContext;
use crate::config::ChatSettings;
use crate::error::{ConfabError, ConfabResult};
use crate::traits::{Embedder, PointSelector, ScrollRequest, VectorRecord, VectorStore};
use crate::types::{now_ts, point_payload, EpisodicRecord, Filter};

/// Filter matching every record of one user's chat.
pub fn chat_records_filter(user_id: &str, chat_id: &str) -> Filter {
    Filter::and(vec![
        Filter::metadata_eq("user_id", user_id),
        Filter::metadata_eq("chat_id", chat_id),
    ])
}

#[derive(Clone)]
pub struct EpisodicStore {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    settings: Arc<ChatSettings>,
}

impl EpisodicStore {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        settings: Arc<ChatSettings>,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
        }
    }

    pub fn collection(&self) -> &str {
        &self.settings.episodic_collection
    }

    pub async fn ensure_collection(&self) -> ConfabResult<()> {
        ensure_collection(self.store.as_ref(), self.embedder.as_ref(), self.collection()).await
    }

    /// Store the context's user message as an open turn of its chat.
    ///
    /// The record carries `user_id`, `chat_id`, a copy of the text and an
    /// empty `bot` field that the reconciler fills in later.
    pub async fn record_user_turn(&self, ctx: &ChatContext) -> ConfabResult<EpisodicRecord> {
        let chat_id = ctx.chat_id.as_deref().ok_or_else(|| {
            ConfabError::Internal("cannot record a turn without a chat id".to_string())
        })?;
        self.ensure_collection().await?;

        let mut metadata = Map::new();
        metadata.insert("source".into(), Value::String(ctx.user_id.clone()));
        metadata.insert("when".into(), Value::from(now_ts()));
        metadata.insert("user_id".into(), Value::String(ctx.user_id.clone()));
        metadata.insert("chat_id".into(), Value::String(chat_id.to_string()));
        metadata.insert("text".into(), Value::String(ctx.user_text.clone()));
        metadata.insert("bot".into(), Value::String(String::new()));

        let vector = self.embedder.embed(&ctx.user_text).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let record = VectorRecord::new(id.clone(), vector, point_payload(&ctx.user_text, &metadata));
        self.store.insert(self.collection(), vec![record]).await?;

        tracing::debug!(user_id = %ctx.user_id, chat_id, record_id = %id, "Recorded user turn");
        Ok(EpisodicRecord {
            id,
            page_content: ctx.user_text.clone(),
            metadata,
        })
    }

    /// The most recent record of `(user_id, chat_id)` whose text is `text`.
    ///
    /// Only the first `open_turn_window` matches are considered.
    pub async fn find_turn(
        &self,
        user_id: &str,
        chat_id: &str,
        text: &str,
    ) -> ConfabResult<Option<EpisodicRecord>> {
        let filter = Filter::and(vec![
            chat_records_filter(user_id, chat_id),
            Filter::metadata_eq("text", text),
        ]);
        let page = self
            .store
            .scroll(
                self.collection(),
                Some(&filter),
                ScrollRequest::new(self.settings.open_turn_window),
            )
            .await?;

        Ok(page
            .records
            .into_iter()
            .map(EpisodicRecord::from_record)
            .max_by(|a, b| a.when().total_cmp(&b.when())))
    }

    /// Attach the assistant reply to a record. One overwrite call.
    pub async fn complete(&self, record: &mut EpisodicRecord, reply: &str) -> ConfabResult<()> {
        record.set_bot(reply);
        self.store
            .overwrite_payload(self.collection(), &record.id, record.to_payload())
            .await
    }

    /// Delete every record of one user's chat.
    pub async fn delete_for_chat(&self, user_id: &str, chat_id: &str) -> ConfabResult<()> {
        self.store
            .delete(
                self.collection(),
                PointSelector::Filter(chat_records_filter(user_id, chat_id)),
            )
            .await
    }
}

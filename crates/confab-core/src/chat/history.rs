//! Rebuild an ordered conversation from unordered episodic records.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ChatSettings;
use crate::error::{ConfabError, ConfabResult};
use crate::traits::VectorStore;
use crate::types::{from_metadata_filters, EpisodicRecord, Message, ASSISTANT_NAME};

/// Turn records into role-tagged messages, oldest first.
///
/// Only records carrying both `text` and `bot` take part. A non-empty
/// `text` becomes a user entry; `bot` always becomes an assistant entry,
/// so an open turn shows up with an empty reply.
pub fn reconstruct(records: &mut [EpisodicRecord], user_id: &str) -> Vec<Message> {
    records.sort_by(|a, b| a.when().total_cmp(&b.when()));

    let mut messages = Vec::with_capacity(records.len() * 2);
    for record in records.iter() {
        let (Some(text), Some(bot)) = (record.text(), record.bot()) else {
            continue;
        };
        if !text.is_empty() {
            messages.push(Message::user(text).with_name(user_id));
        }
        messages.push(Message::assistant(bot).with_name(ASSISTANT_NAME));
    }
    messages
}

/// Loads a chat's records and reconstructs its history.
#[derive(Clone)]
pub struct HistoryReconstructor {
    store: Arc<dyn VectorStore>,
    settings: Arc<ChatSettings>,
}

impl HistoryReconstructor {
    pub fn new(store: Arc<dyn VectorStore>, settings: Arc<ChatSettings>) -> Self {
        Self { store, settings }
    }

    /// All records of `collection` matching `user_id` (and `chat_id`, when
    /// given), sorted by `when`, with the reconstructed messages.
    pub async fn load(
        &self,
        collection: &str,
        user_id: &str,
        chat_id: Option<&str>,
    ) -> ConfabResult<(Vec<EpisodicRecord>, Vec<Message>)> {
        if !self.store.collection_exists(collection).await? {
            return Err(ConfabError::collection_not_found(collection));
        }

        let criteria = HashMap::from([
            ("user_id".to_string(), serde_json::Value::from(user_id)),
            (
                "chat_id".to_string(),
                chat_id.map_or(serde_json::Value::Null, serde_json::Value::from),
            ),
        ]);
        let filter = from_metadata_filters(&criteria);

        let mut records: Vec<EpisodicRecord> = self
            .store
            .scroll_all(collection, filter.as_ref(), self.settings.scroll_page_size)
            .await?
            .into_iter()
            .map(EpisodicRecord::from_record)
            .collect();

        let messages = reconstruct(&mut records, user_id);
        tracing::debug!(
            collection,
            user_id,
            records = records.len(),
            messages = messages.len(),
            "Reconstructed chat history"
        );
        Ok((records, messages))
    }
}

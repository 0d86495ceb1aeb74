//! Session store: chat records in the vector store.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::ChatSettings;
use crate::error::ConfabResult;
use crate::traits::{
    CollectionSpec, DistanceMetric, Embedder, PointSelector, VectorRecord, VectorStore,
};
use crate::types::{point_payload, ChatSession, Filter};

/// Create `name` if it does not exist yet, sized for the embedder.
pub async fn ensure_collection(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    name: &str,
) -> ConfabResult<()> {
    if store.collection_exists(name).await? {
        return Ok(());
    }
    let dimension = embedder.resolved_dimension().await?;
    store
        .create_collection(&CollectionSpec {
            name: name.to_string(),
            dimension,
            distance: DistanceMetric::Cosine,
            embedder_name: embedder.model_name().to_string(),
        })
        .await?;
    tracing::info!(
        collection = name,
        dimension,
        embedder = embedder.model_name(),
        "'{}' collection created and registered",
        name
    );
    Ok(())
}

/// Filter used by chat listings: every point must carry `deleted: false`.
pub fn listing_filter(owner: &str) -> Filter {
    Filter::and(vec![
        Filter::metadata_eq("source", owner),
        Filter::metadata_eq("deleted", false),
    ])
}

/// Sessions owned by `owner` that are not soft-deleted.
///
/// Points without a `deleted` flag count as active.
pub fn active_sessions_filter(owner: &str) -> Filter {
    Filter::and(vec![
        Filter::metadata_eq("source", owner),
        Filter::not(Filter::metadata_eq("deleted", true)),
    ])
}

/// Typed access to the sessions collection.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    settings: Arc<ChatSettings>,
}

impl SessionStore {
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

    /// Name of the sessions collection.
    pub fn collection(&self) -> &str {
        &self.settings.sessions_collection
    }

    /// Idempotent bootstrap of the sessions collection.
    pub async fn ensure_collection(&self) -> ConfabResult<()> {
        ensure_collection(self.store.as_ref(), self.embedder.as_ref(), self.collection()).await
    }

    /// Fetch a session by id.
    pub async fn get(&self, id: &str) -> ConfabResult<Option<ChatSession>> {
        let mut records = self
            .store
            .retrieve(self.collection(), &[id.to_string()], false)
            .await?;
        match records.pop() {
            Some(record) => ChatSession::from_record(record).map(Some),
            None => Ok(None),
        }
    }

    /// All active sessions of `owner`, in store order.
    pub async fn active_for(&self, owner: &str) -> ConfabResult<Vec<ChatSession>> {
        let records = self
            .store
            .scroll_all(
                self.collection(),
                Some(&active_sessions_filter(owner)),
                self.settings.scroll_page_size,
            )
            .await?;
        records.into_iter().map(ChatSession::from_record).collect()
    }

    /// The earliest active session of `owner` still carrying the default name.
    pub async fn find_default(&self, owner: &str) -> ConfabResult<Option<ChatSession>> {
        let filter = Filter::and(vec![
            active_sessions_filter(owner),
            Filter::metadata_eq("name", self.settings.default_chat_name.as_str()),
        ]);
        let records = self
            .store
            .scroll_all(self.collection(), Some(&filter), self.settings.scroll_page_size)
            .await?;

        let mut sessions = records
            .into_iter()
            .map(ChatSession::from_record)
            .collect::<ConfabResult<Vec<_>>>()?;
        sessions.sort_by(|a, b| a.when().total_cmp(&b.when()));
        Ok(sessions.into_iter().next())
    }

    /// Embed `content` and store a new session with the given metadata.
    pub async fn insert(&self, content: &str, metadata: Map<String, Value>) -> ConfabResult<ChatSession> {
        let vector = self.embedder.embed(content).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let record = VectorRecord::new(id.clone(), vector.clone(), point_payload(content, &metadata));
        self.store.insert(self.collection(), vec![record]).await?;

        Ok(ChatSession {
            id,
            page_content: content.to_string(),
            metadata,
            vector,
        })
    }

    /// Write the session's payload back, keeping its vector.
    pub async fn overwrite(&self, session: &ChatSession) -> ConfabResult<()> {
        self.store
            .overwrite_payload(self.collection(), &session.id, session.to_payload())
            .await
    }

    /// Remove a session point.
    pub async fn remove(&self, id: &str) -> ConfabResult<()> {
        self.store
            .delete(self.collection(), PointSelector::Ids(vec![id.to_string()]))
            .await
    }
}

//! Vector store trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfabResult;
use crate::types::Filter;

/// Distance metric for vector similarity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

/// A vector record with payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier.
    pub id: String,
    /// Vector embedding (empty when not requested).
    pub vector: Vec<f32>,
    /// Payload.
    pub payload: HashMap<String, serde_json::Value>,
}

impl VectorRecord {
    /// Create a new vector record.
    pub fn new(
        id: impl Into<String>,
        vector: Vec<f32>,
        payload: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }

    /// The payload as a single JSON object, for filter evaluation.
    pub fn payload_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.payload
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Parameters for creating a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: DistanceMetric,
    /// Name of the embedder whose vectors the collection holds.
    pub embedder_name: String,
}

/// One page of a scroll request.
#[derive(Debug, Clone, Default)]
pub struct ScrollRequest {
    /// Page size.
    pub limit: usize,
    /// Cursor returned by the previous page.
    pub offset: Option<String>,
    pub with_vectors: bool,
}

impl ScrollRequest {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            offset: None,
            with_vectors: false,
        }
    }
}

/// Result of a scroll request.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub records: Vec<VectorRecord>,
    /// Cursor for the next page, `None` when exhausted.
    pub next_offset: Option<String>,
}

/// Which points a delete addresses.
#[derive(Debug, Clone)]
pub enum PointSelector {
    Ids(Vec<String>),
    Filter(Filter),
}

/// Core VectorStore trait - all vector store backends implement this.
///
/// Every operation names its collection; a missing collection surfaces as
/// [`crate::error::ConfabError::CollectionNotFound`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection. Creating an existing collection is a no-op.
    async fn create_collection(&self, spec: &CollectionSpec) -> ConfabResult<()>;

    /// Check whether a collection exists.
    async fn collection_exists(&self, name: &str) -> ConfabResult<bool>;

    /// Insert (or replace) points.
    async fn insert(&self, collection: &str, records: Vec<VectorRecord>) -> ConfabResult<()>;

    /// Fetch one page of points matching an optional filter.
    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        request: ScrollRequest,
    ) -> ConfabResult<ScrollPage>;

    /// Fetch every point matching an optional filter, following the cursor.
    async fn scroll_all(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        page_size: usize,
    ) -> ConfabResult<Vec<VectorRecord>> {
        let mut records = Vec::new();
        let mut offset = None;
        loop {
            let page = self
                .scroll(
                    collection,
                    filter,
                    ScrollRequest {
                        limit: page_size.max(1),
                        offset,
                        with_vectors: false,
                    },
                )
                .await?;
            records.extend(page.records);
            match page.next_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(records)
    }

    /// Fetch points by id. Unknown ids are skipped.
    async fn retrieve(
        &self,
        collection: &str,
        ids: &[String],
        with_vectors: bool,
    ) -> ConfabResult<Vec<VectorRecord>>;

    /// Replace the payload of one point, keeping its vector.
    async fn overwrite_payload(
        &self,
        collection: &str,
        id: &str,
        payload: HashMap<String, serde_json::Value>,
    ) -> ConfabResult<()>;

    /// Delete points.
    async fn delete(&self, collection: &str, selector: PointSelector) -> ConfabResult<()>;
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Provider type.
    pub provider: VectorStoreProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: serde_json::Value,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Memory,
            config: serde_json::json!({}),
        }
    }
}

/// Vector store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreProvider {
    /// Embedded, process-local store.
    #[default]
    Memory,
    Qdrant,
}

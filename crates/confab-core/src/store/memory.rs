//! Embedded vector store kept in process memory.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

use crate::error::{ConfabError, ConfabResult};
use crate::traits::{
    CollectionSpec, PointSelector, ScrollPage, ScrollRequest, VectorRecord, VectorStore,
};
use crate::types::Filter;

struct Collection {
    spec: CollectionSpec,
    // Ordered by id so scroll cursors are stable.
    points: BTreeMap<String, VectorRecord>,
}

/// Vector store that keeps every collection in memory.
///
/// Scrolling walks points in id order and uses the next id as cursor, the
/// same contract Qdrant offers.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection.
    pub async fn count(&self, collection: &str) -> ConfabResult<usize> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.points.len())
            .ok_or_else(|| ConfabError::collection_not_found(collection))
    }
}

fn strip_vector(mut record: VectorRecord, with_vectors: bool) -> VectorRecord {
    if !with_vectors {
        record.vector = Vec::new();
    }
    record
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, spec: &CollectionSpec) -> ConfabResult<()> {
        let mut collections = self.collections.write().await;
        if !collections.contains_key(&spec.name) {
            tracing::info!(
                collection = %spec.name,
                dimension = spec.dimension,
                embedder = %spec.embedder_name,
                "Creating in-memory collection"
            );
            collections.insert(
                spec.name.clone(),
                Collection {
                    spec: spec.clone(),
                    points: BTreeMap::new(),
                },
            );
        }
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> ConfabResult<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn insert(&self, collection: &str, records: Vec<VectorRecord>) -> ConfabResult<()> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| ConfabError::collection_not_found(collection))?;

        for record in &records {
            if target.spec.dimension > 0 && record.vector.len() != target.spec.dimension {
                return Err(ConfabError::vector_store(format!(
                    "vector for point '{}' has dimension {}, collection '{}' expects {}",
                    record.id,
                    record.vector.len(),
                    collection,
                    target.spec.dimension
                )));
            }
        }
        for record in records {
            target.points.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        request: ScrollRequest,
    ) -> ConfabResult<ScrollPage> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| ConfabError::collection_not_found(collection))?;

        let start = match &request.offset {
            Some(offset) => Bound::Included(offset.clone()),
            None => Bound::Unbounded,
        };
        let limit = request.limit.max(1);

        let mut matching = target
            .points
            .range((start, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| filter.map_or(true, |f| f.matches(&record.payload_value())));

        let records: Vec<VectorRecord> = matching
            .by_ref()
            .take(limit)
            .map(|r| strip_vector(r.clone(), request.with_vectors))
            .collect();
        let next_offset = matching.next().map(|r| r.id.clone());

        Ok(ScrollPage {
            records,
            next_offset,
        })
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[String],
        with_vectors: bool,
    ) -> ConfabResult<Vec<VectorRecord>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| ConfabError::collection_not_found(collection))?;

        Ok(ids
            .iter()
            .filter_map(|id| target.points.get(id))
            .map(|r| strip_vector(r.clone(), with_vectors))
            .collect())
    }

    async fn overwrite_payload(
        &self,
        collection: &str,
        id: &str,
        payload: HashMap<String, serde_json::Value>,
    ) -> ConfabResult<()> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| ConfabError::collection_not_found(collection))?;

        match target.points.get_mut(id) {
            Some(record) => {
                record.payload = payload;
                Ok(())
            }
            None => Err(ConfabError::point_not_found(collection, id)),
        }
    }

    async fn delete(&self, collection: &str, selector: PointSelector) -> ConfabResult<()> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| ConfabError::collection_not_found(collection))?;

        match selector {
            PointSelector::Ids(ids) => {
                for id in ids {
                    target.points.remove(&id);
                }
            }
            PointSelector::Filter(filter) => {
                target
                    .points
                    .retain(|_, record| !filter.matches(&record.payload_value()));
            }
        }
        Ok(())
    }
}

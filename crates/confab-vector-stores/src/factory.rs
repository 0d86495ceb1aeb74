//! Factory for creating vector store providers.

use std::sync::Arc;

use confab_core::error::{ConfabError, ConfabResult};
use confab_core::store::InMemoryVectorStore;
use confab_core::traits::{VectorStore, VectorStoreConfig, VectorStoreProvider};

/// Factory for creating vector store providers.
pub struct VectorStoreFactory;

impl VectorStoreFactory {
    /// Create a vector store from the given configuration.
    pub async fn create(
        provider: VectorStoreProvider,
        config: VectorStoreConfig,
    ) -> ConfabResult<Arc<dyn VectorStore>> {
        match provider {
            VectorStoreProvider::Memory => Ok(Arc::new(InMemoryVectorStore::new())),

            #[cfg(feature = "qdrant")]
            VectorStoreProvider::Qdrant => {
                let store = crate::qdrant::QdrantVectorStore::new(config).await?;
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "qdrant"))]
            VectorStoreProvider::Qdrant => {
                let _ = config;
                Err(ConfabError::UnsupportedProvider {
                    provider: "qdrant (enable the 'qdrant' feature)".to_string(),
                })
            }
        }
    }

    /// Create a vector store from its configuration section.
    pub async fn from_config(config: &VectorStoreConfig) -> ConfabResult<Arc<dyn VectorStore>> {
        Self::create(config.provider, config.clone()).await
    }
}

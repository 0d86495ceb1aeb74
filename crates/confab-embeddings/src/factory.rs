//! Builds the configured embedder behind `Arc<dyn Embedder>`.

use std::sync::Arc;

use confab_core::config::EmbedderProviderConfig;
use confab_core::error::ConfabResult;
use confab_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};

pub struct EmbedderFactory;

impl EmbedderFactory {
    pub fn create(provider: EmbedderProvider, config: EmbedderConfig) -> ConfabResult<Arc<dyn Embedder>> {
        match provider {
            #[cfg(feature = "openai")]
            EmbedderProvider::OpenAI => Ok(Arc::new(crate::openai::OpenAIEmbedder::new(config)?)),
            #[cfg(not(feature = "openai"))]
            EmbedderProvider::OpenAI => {
                let _ = config;
                Err(confab_core::error::ConfabError::UnsupportedProvider {
                    provider: "openai (built without the `openai` feature)".to_string(),
                })
            }
        }
    }

    pub fn from_config(config: &EmbedderProviderConfig) -> ConfabResult<Arc<dyn Embedder>> {
        Self::create(config.provider, config.config.clone())
    }
}

#[cfg(all(test, feature = "openai"))]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = EmbedderProviderConfig {
            provider: EmbedderProvider::OpenAI,
            config: EmbedderConfig {
                model: "text-embedding-3-large".to_string(),
                embedding_dims: 3072,
                api_key: Some("sk-test".to_string()),
                base_url: None,
            },
        };
        let embedder = EmbedderFactory::from_config(&config).unwrap();
        assert_eq!(embedder.model_name(), "text-embedding-3-large");
        assert_eq!(embedder.dimension(), 3072);
    }
}

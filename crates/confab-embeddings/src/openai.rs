//! Embeddings through the OpenAI API (or any compatible endpoint).

use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequest, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;

use confab_core::error::{ConfabError, ConfabResult};
use confab_core::traits::{Embedder, EmbedderConfig};

pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    config: EmbedderConfig,
}

impl OpenAIEmbedder {
    pub fn new(config: EmbedderConfig) -> ConfabResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                ConfabError::Configuration(
                    "no OpenAI API key: set OPENAI_API_KEY or embedder.api_key".to_string(),
                )
            })?;

        let mut client_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &config.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                ConfabError::Configuration(format!("invalid embedder.base_url '{}': {}", base_url, e))
            })?;
            client_config = client_config.with_api_base(parsed.as_str().trim_end_matches('/'));
        }

        Ok(Self {
            client: Client::with_config(client_config),
            config,
        })
    }

    /// Reject vectors that would not fit the collection.
    fn check_dimension(&self, vector: Vec<f32>) -> ConfabResult<Vec<f32>> {
        let expected = self.config.embedding_dims;
        if expected != 0 && vector.len() != expected {
            return Err(ConfabError::embedding(format!(
                "'{}' returned {} dimensions, configured for {}",
                self.config.model,
                vector.len(),
                expected
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> ConfabResult<Vec<f32>> {
        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| ConfabError::embedding(format!("embedding with '{}' failed: {}", self.config.model, e)))?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| ConfabError::embedding("embedding response was empty"))?;
        self.check_dimension(vector)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dims
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

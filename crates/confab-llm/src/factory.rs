//! Builds the configured LLM behind `Arc<dyn Llm>`.

use std::sync::Arc;

use confab_core::config::{LlmProvider, LlmProviderConfig};
use confab_core::error::ConfabResult;
use confab_core::traits::{Llm, LlmConfig};

pub struct LlmFactory;

impl LlmFactory {
    pub fn create(provider: LlmProvider, config: LlmConfig) -> ConfabResult<Arc<dyn Llm>> {
        match provider {
            #[cfg(feature = "openai")]
            LlmProvider::OpenAI => Ok(Arc::new(crate::openai::OpenAIProvider::new(config)?)),
            #[cfg(not(feature = "openai"))]
            LlmProvider::OpenAI => {
                let _ = config;
                Err(confab_core::error::ConfabError::UnsupportedProvider {
                    provider: "openai (built without the `openai` feature)".to_string(),
                })
            }
        }
    }

    pub fn from_config(config: &LlmProviderConfig) -> ConfabResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }
}

#[cfg(all(test, feature = "openai"))]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = LlmProviderConfig {
            provider: LlmProvider::OpenAI,
            config: LlmConfig {
                model: "gpt-4.1-nano".to_string(),
                api_key: Some("sk-test".to_string()),
                ..Default::default()
            },
        };
        let llm = LlmFactory::from_config(&config).unwrap();
        assert_eq!(llm.model_name(), "gpt-4.1-nano");
    }
}

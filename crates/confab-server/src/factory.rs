//! Factory for creating the chat layer from configuration.

use confab_core::config::MultiChatConfig;
use confab_core::error::ConfabResult;
use confab_core::MultiChat;

use confab_embeddings::EmbedderFactory;
use confab_llm::LlmFactory;
use confab_vector_stores::VectorStoreFactory;

/// Create a bootstrapped [`MultiChat`] from configuration.
///
/// Both collections exist once this returns.
pub async fn create_multi_chat(config: &MultiChatConfig) -> ConfabResult<MultiChat> {
    config.validate()?;

    let llm = LlmFactory::from_config(&config.llm)?;
    let embedder = EmbedderFactory::from_config(&config.embedder)?;
    let vector_store = VectorStoreFactory::from_config(&config.vector_store).await?;

    tracing::info!(
        llm = %llm.model_name(),
        embedder = %embedder.model_name(),
        vector_store = ?config.vector_store.provider,
        "Creating chat layer"
    );

    let chat = MultiChat::new(vector_store, embedder, llm, config.chats.clone())?;
    chat.bootstrap().await?;
    Ok(chat)
}

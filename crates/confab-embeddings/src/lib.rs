//! confab-embeddings - Embedding providers for confab.
//!
//! Chat sessions and episodic turns are stored as vectors; this crate
//! provides the embedder that produces them. The OpenAI embedder
//! (feature `openai`, on by default) also serves compatible endpoints
//! through `base_url`. An `embedding_dims` of 0 makes the chat layer probe
//! the model once when it creates a collection.

mod factory;
#[cfg(feature = "openai")]
mod openai;

pub use factory::EmbedderFactory;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbedder;

pub use confab_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};

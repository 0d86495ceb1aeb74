//! confab-vector-stores - Vector store backends for confab.
//!
//! Chats and episodic turns live in named collections of a vector store.
//!
//! # Supported Backends
//!
//! - **Memory** (always available) - process-local store, nothing persists
//! - **Qdrant** (feature: `qdrant`) - High-performance vector database

mod factory;

#[cfg(feature = "qdrant")]
mod qdrant;

pub use factory::VectorStoreFactory;

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;

// Re-export core types for convenience
pub use confab_core::store::InMemoryVectorStore;
pub use confab_core::traits::{VectorStore, VectorStoreConfig, VectorStoreProvider};

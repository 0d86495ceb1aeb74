//! confab-core - Core library for confab.
//!
//! This crate provides the core types, traits, configuration and the
//! multi-chat session layer that sits on top of a vector memory store.
//!
//! # Example
//!
//! ```ignore
//! use confab_core::{ChatContext, ChatSettings, InMemoryVectorStore, MultiChat};
//!
//! let chats = MultiChat::new(Arc::new(InMemoryVectorStore::new()), embedder, llm, ChatSettings::default())?;
//!
//! // A turn without a chat id is bound to the user's default chat
//! let mut ctx = ChatContext::new("alice", "What is a lifetime?");
//! let reply = chats.respond(&mut ctx).await?;
//!
//! // Manage chats explicitly
//! chats.rename_chat("alice", reply.chat_id.as_deref().unwrap(), "Rust questions").await;
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use chat::{ChatContext, CreateChatRequest, MultiChat, ReconcileOutcome, TurnReply};
pub use config::{ChatSettings, MultiChatConfig, RetryPolicy};
pub use error::{ConfabError, ConfabResult, ErrorCode};
pub use store::InMemoryVectorStore;
pub use traits::{
    Embedder, EmbedderConfig, Llm, LlmConfig, LlmResponse, VectorStore, VectorStoreConfig,
};
pub use types::{
    ChatExport, ChatSession, EpisodicRecord, Filter, MemoryPoint, Message, MessageRole,
    PointList, PointSummary,
};

//! Built-in vector store backends.

mod memory;

pub use memory::InMemoryVectorStore;

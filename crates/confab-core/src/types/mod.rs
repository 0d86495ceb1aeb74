//! Core types for confab.

mod chat;
mod filter;
mod message;

pub use chat::*;
pub use filter::*;
pub use message::*;

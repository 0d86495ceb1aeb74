//! confab-llm - LLM providers for confab.
//!
//! The chat layer uses an LLM to title new chats and, in the standalone
//! server, to produce the assistant reply of a turn. The OpenAI provider
//! (feature `openai`, on by default) also serves compatible endpoints
//! through `base_url`.
//!
//! ```ignore
//! use confab_core::config::MultiChatConfig;
//! use confab_llm::LlmFactory;
//!
//! let config = MultiChatConfig::from_env()?;
//! let llm = LlmFactory::from_config(&config.llm)?;
//! ```

mod factory;
#[cfg(feature = "openai")]
mod openai;

pub use factory::LlmFactory;
#[cfg(feature = "openai")]
pub use openai::OpenAIProvider;

pub use confab_core::config::LlmProvider;
pub use confab_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};

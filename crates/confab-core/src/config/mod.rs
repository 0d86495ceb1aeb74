//! Configuration system for confab.

use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfabError, ConfabResult};
use crate::traits::{
    EmbedderConfig, EmbedderProvider, LlmConfig, VectorStoreConfig, VectorStoreProvider,
};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            config: LlmConfig::default(),
        }
    }
}

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

impl Default for EmbedderProviderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::OpenAI,
            config: EmbedderConfig::default(),
        }
    }
}

/// Retry policy for idempotent store writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 disables retries).
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds).
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2_000,
            multiplier: 2.0_f32,
        }
    }
}

impl RetryPolicy {
    /// Backoff schedule for this policy.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_max_times(self.max_retries as usize)
            .with_min_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_factor(self.multiplier)
    }
}

/// Chat session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Active chats allowed per user; -1 means unlimited.
    pub max_chats: i64,
    /// Name given to new chats until they are renamed.
    pub default_chat_name: String,
    /// Collection holding chat session points.
    pub sessions_collection: String,
    /// Collection holding episodic turn records.
    pub episodic_collection: String,
    /// Mark chats deleted instead of removing them.
    pub soft_delete: bool,
    /// Serialize session mutations per user.
    pub serialize_session_mutations: bool,
    /// Upper bound for the auto-naming LLM call.
    pub title_timeout_secs: u64,
    /// How many candidate records are considered when attaching a reply.
    pub open_turn_window: usize,
    /// Page size for cursor pagination over the store.
    pub scroll_page_size: usize,
    /// Retry policy for rename and delete writes.
    pub store_retry: RetryPolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_chats: 4,
            default_chat_name: "New Unnamed Chat".to_string(),
            sessions_collection: "chat".to_string(),
            episodic_collection: "episodic".to_string(),
            soft_delete: false,
            serialize_session_mutations: true,
            title_timeout_secs: 10,
            open_turn_window: 10,
            scroll_page_size: 256,
            store_retry: RetryPolicy::default(),
        }
    }
}

impl ChatSettings {
    /// Whether the per-user chat cap is disabled.
    pub fn unlimited(&self) -> bool {
        self.max_chats == -1
    }

    /// Check the settings for values the chat layer cannot work with.
    pub fn validate(&self) -> ConfabResult<()> {
        if self.max_chats < -1 {
            return Err(ConfabError::Configuration(format!(
                "max_chats must be -1 (unlimited) or a non-negative number, got {}",
                self.max_chats
            )));
        }
        if self.default_chat_name.trim().is_empty() {
            return Err(ConfabError::Configuration(
                "default_chat_name must not be empty".to_string(),
            ));
        }
        if self.sessions_collection.is_empty() || self.episodic_collection.is_empty() {
            return Err(ConfabError::Configuration(
                "collection names must not be empty".to_string(),
            ));
        }
        if self.sessions_collection == self.episodic_collection {
            return Err(ConfabError::Configuration(
                "sessions and episodic collections must differ".to_string(),
            ));
        }
        if self.open_turn_window == 0 || self.scroll_page_size == 0 {
            return Err(ConfabError::Configuration(
                "open_turn_window and scroll_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main multi-chat configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiChatConfig {
    /// Vector store configuration.
    pub vector_store: VectorStoreConfig,
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Embedder configuration.
    pub embedder: EmbedderProviderConfig,
    /// Chat session settings.
    pub chats: ChatSettings,
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".confab"))
        .unwrap_or_else(|| PathBuf::from(".confab"))
        .join("config.toml")
}

impl MultiChatConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> ConfabResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ConfabError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ConfabError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| ConfabError::Configuration(e.to_string()))?,
            _ => {
                return Err(ConfabError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> ConfabResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `CONFAB_*` environment variables onto this configuration.
    pub fn apply_env(&mut self) -> ConfabResult<()> {
        // LLM configuration
        if let Ok(provider) = std::env::var("CONFAB_LLM_PROVIDER") {
            self.llm.provider = match provider.to_lowercase().as_str() {
                "openai" => LlmProvider::OpenAI,
                other => {
                    return Err(ConfabError::UnsupportedProvider {
                        provider: other.to_string(),
                    })
                }
            };
        }
        if let Ok(model) = std::env::var("CONFAB_LLM_MODEL") {
            self.llm.config.model = model;
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.llm.config.api_key = Some(api_key.clone());
            self.embedder.config.api_key = Some(api_key);
        }

        // Embedder configuration
        if let Ok(provider) = std::env::var("CONFAB_EMBEDDER_PROVIDER") {
            self.embedder.provider = match provider.to_lowercase().as_str() {
                "openai" => EmbedderProvider::OpenAI,
                other => {
                    return Err(ConfabError::UnsupportedProvider {
                        provider: other.to_string(),
                    })
                }
            };
        }
        if let Ok(model) = std::env::var("CONFAB_EMBEDDER_MODEL") {
            self.embedder.config.model = model;
        }
        if let Ok(dims) = std::env::var("CONFAB_EMBEDDER_DIMS") {
            self.embedder.config.embedding_dims = parse_env("CONFAB_EMBEDDER_DIMS", &dims)?;
        }

        // Vector store configuration
        if let Ok(provider) = std::env::var("CONFAB_VECTOR_STORE_PROVIDER") {
            self.vector_store.provider = match provider.to_lowercase().as_str() {
                "memory" => VectorStoreProvider::Memory,
                "qdrant" => VectorStoreProvider::Qdrant,
                other => {
                    return Err(ConfabError::UnsupportedProvider {
                        provider: other.to_string(),
                    })
                }
            };
        }
        if let Ok(url) = std::env::var("CONFAB_QDRANT_URL") {
            if let Some(obj) = self.vector_store.config.as_object_mut() {
                obj.insert("url".to_string(), serde_json::Value::String(url));
            }
        }

        // Chat settings
        if let Ok(max) = std::env::var("CONFAB_MAX_CHATS") {
            self.chats.max_chats = parse_env("CONFAB_MAX_CHATS", &max)?;
        }
        if let Ok(name) = std::env::var("CONFAB_DEFAULT_CHAT_NAME") {
            self.chats.default_chat_name = name;
        }
        if let Ok(flag) = std::env::var("CONFAB_SOFT_DELETE") {
            self.chats.soft_delete = parse_env("CONFAB_SOFT_DELETE", &flag)?;
        }

        Ok(())
    }

    /// Check the whole configuration.
    pub fn validate(&self) -> ConfabResult<()> {
        self.chats.validate()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> ConfabResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConfabError::Configuration(format!("invalid value for {}: {}", key, raw)))
}

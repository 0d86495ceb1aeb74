//! Error types for confab operations.
//!
//! Every failure carries a structured [`ErrorCode`] so callers (and the REST
//! layer) can tell user-facing conditions apart from collaborator failures.

use thiserror::Error;

/// Result type alias for confab operations.
pub type ConfabResult<T> = Result<T, ConfabError>;

/// Main error type for all confab operations.
#[derive(Error, Debug)]
pub enum ConfabError {
    /// The owner already has the maximum number of active chats.
    #[error("Too many chats created, you can have a maximum of {max_chats}")]
    CapacityExceeded { max_chats: i64 },

    /// A chat session (or other record) does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        id: Option<String>,
    },

    /// The caller does not own the record it tried to change.
    #[error("Forbidden: {message}")]
    Forbidden { message: String, code: ErrorCode },

    /// The requested collection is not known to the vector store.
    #[error("Collection does not exist.")]
    CollectionNotFound { collection: String },

    /// Vector store operation failed.
    #[error("Vector store error: {message}")]
    VectorStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding generation failed.
    #[error("Embedding error: {message}")]
    Embedding {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A bounded operation did not finish in time.
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Chats (CHAT_xxx)
    ChatCapacityExceeded,
    ChatNotFound,
    ChatForbidden,

    // Vector Store (VEC_xxx)
    VecConnectionFailed,
    VecOperationFailed,
    VecCollectionNotFound,
    VecPointNotFound,

    // Embedding (EMB_xxx)
    EmbGenerationFailed,

    // LLM (LLM_xxx)
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Network (NET_xxx)
    NetTimeout,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ChatCapacityExceeded => "CHAT_001",
            ErrorCode::ChatNotFound => "CHAT_002",
            ErrorCode::ChatForbidden => "CHAT_003",
            ErrorCode::VecConnectionFailed => "VEC_001",
            ErrorCode::VecOperationFailed => "VEC_002",
            ErrorCode::VecCollectionNotFound => "VEC_003",
            ErrorCode::VecPointNotFound => "VEC_004",
            ErrorCode::EmbGenerationFailed => "EMB_001",
            ErrorCode::LlmGenerationFailed => "LLM_001",
            ErrorCode::LlmInvalidResponse => "LLM_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl ConfabError {
    /// Create a not found error for a chat session.
    pub fn not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("Chat with id '{}' not found", id),
            code: ErrorCode::ChatNotFound,
            id: Some(id),
        }
    }

    /// Create a not found error for a point of a collection.
    pub fn point_not_found(collection: &str, id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("point '{}' does not exist in collection '{}'", id, collection),
            code: ErrorCode::VecPointNotFound,
            id: Some(id),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            code: ErrorCode::ChatForbidden,
        }
    }

    /// Create a collection-not-found error.
    pub fn collection_not_found(collection: impl Into<String>) -> Self {
        Self::CollectionNotFound {
            collection: collection.into(),
        }
    }

    /// Create a vector store error.
    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStore {
            message: message.into(),
            code: ErrorCode::VecOperationFailed,
            source: None,
        }
    }

    /// Create a vector store connection error.
    pub fn vector_store_connection(message: impl Into<String>) -> Self {
        Self::VectorStore {
            message: message.into(),
            code: ErrorCode::VecConnectionFailed,
            source: None,
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            code: ErrorCode::EmbGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CapacityExceeded { .. } => ErrorCode::ChatCapacityExceeded,
            Self::NotFound { code, .. } => *code,
            Self::Forbidden { code, .. } => *code,
            Self::CollectionNotFound { .. } => ErrorCode::VecCollectionNotFound,
            Self::VectorStore { code, .. } => *code,
            Self::Embedding { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Timeout { .. } => ErrorCode::NetTimeout,
            Self::Configuration(_) | Self::UnsupportedProvider { .. } => ErrorCode::CfgInvalid,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the error is a condition the caller is meant to see.
    ///
    /// Everything else degrades to a boolean/empty result plus a log entry.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::NotFound { .. } | Self::CollectionNotFound { .. }
        )
    }

    /// Whether retrying the same idempotent request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::VectorStore { .. } | Self::Timeout { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::CapacityExceeded { .. } => Some("Delete an existing chat before creating a new one"),
            Self::NotFound { .. } => Some("Please check the chat ID and ensure it exists"),
            Self::CollectionNotFound { .. } => Some("Please check the collection name"),
            Self::VectorStore { .. } => Some("Please check your vector store connection settings"),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            Self::Embedding { .. } => Some("Please check your embedding provider configuration"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_reports_cap() {
        let err = ConfabError::CapacityExceeded { max_chats: 4 };
        assert_eq!(
            err.to_string(),
            "Too many chats created, you can have a maximum of 4"
        );
        assert_eq!(err.code(), ErrorCode::ChatCapacityExceeded);
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_not_found_error() {
        let err = ConfabError::not_found("chat-1");
        assert_eq!(err.code(), ErrorCode::ChatNotFound);
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("chat-1"));
    }

    #[test]
    fn test_collection_not_found_message() {
        let err = ConfabError::collection_not_found("nope");
        assert_eq!(err.to_string(), "Collection does not exist.");
        assert_eq!(err.code().as_str(), "VEC_003");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ConfabError::vector_store("boom").is_transient());
        assert!(!ConfabError::point_not_found("chat", "p1").is_transient());
        assert!(!ConfabError::forbidden("nope").is_transient());
        assert!(!ConfabError::forbidden("nope").is_user_facing());
    }
}

//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

use confab_core::error::ConfabError;

/// How an error message is written to the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBody {
    /// The bare message as `text/plain`.
    Text,
    /// `{"error": "<message>"}`.
    Keyed,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub body: ErrorBody,
}

impl ApiError {
    /// 400 carrying the bare message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            body: ErrorBody::Text,
        }
    }

    /// 400 wrapping the message under `error`.
    pub fn bad_request_keyed(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            body: ErrorBody::Keyed,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            body: ErrorBody::Keyed,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.body {
            ErrorBody::Text => (self.status, self.message).into_response(),
            ErrorBody::Keyed => {
                (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
            }
        }
    }
}

// Only conditions the caller can act on keep their message.
impl From<ConfabError> for ApiError {
    fn from(err: ConfabError) -> Self {
        match err {
            ConfabError::CollectionNotFound { .. } => ApiError::bad_request_keyed(err.to_string()),
            _ if err.is_user_facing() => ApiError::bad_request(err.to_string()),
            _ => {
                tracing::error!(
                    code = err.code().as_str(),
                    error = %err,
                    hint = err.suggestion().unwrap_or_default(),
                    "Request failed"
                );
                ApiError::internal("The request could not be completed")
            }
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

//! Request extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header naming the calling user.
pub const USER_ID_HEADER: &str = "user_id";

/// Identity used when a request names no user.
pub const DEFAULT_USER_ID: &str = "user";

/// The calling user, taken from the `user_id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_USER_ID);
        Ok(CallerId(user_id.to_string()))
    }
}

//! GET /health

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Both chat collections exist in the store.
    pub collections_ready: bool,
}

/// 200 when the store answers and holds both collections, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ready = match state.chat.collections_ready().await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::warn!(error = %e, "Store unreachable during health check");
            false
        }
    };

    let (code, status) = if ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            collections_ready: ready,
        }),
    )
}

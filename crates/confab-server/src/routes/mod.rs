//! Route definitions for the REST API.

mod chats;
mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Chat sessions
        .route("/createChat", post(chats::create_chat))
        .route(
            "/memory/collections/:collection_id/points/by_metadata_chat",
            post(chats::list_chats),
        )
        .route(
            "/memory/collections/:collection_id/points/by_metadata_messages",
            post(chats::chat_messages),
        )
        .route("/delete_chat", delete(chats::delete_chat))
        .route(
            "/memory/collections/points/changeNameChat",
            post(chats::rename_chat),
        )
        .route("/giveAll", post(chats::export_chat))
        // Conversation
        .route("/message", post(chats::send_message))
        // Attach state
        .with_state(state)
}

pub use chats::*;
pub use health::*;

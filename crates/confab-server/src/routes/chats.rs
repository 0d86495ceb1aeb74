//! Chat session endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use confab_core::types::{ChatExport, MemoryPoint, PointList};
use confab_core::CreateChatRequest;

use crate::error::ApiResult;
use crate::extract::CallerId;
use crate::state::AppState;

/// Create a chat for the caller.
/// POST /createChat
pub async fn create_chat(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    body: Option<Json<CreateChatRequest>>,
) -> ApiResult<Json<MemoryPoint>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let point = state.chat.create_chat(&user_id, request).await?;
    Ok(Json(point))
}

/// List the caller's active chats in a collection.
/// POST /memory/collections/:collection_id/points/by_metadata_chat
pub async fn list_chats(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(collection_id): Path<String>,
) -> ApiResult<Json<PointList>> {
    let points = state.chat.list_chats(&user_id, &collection_id).await?;
    Ok(Json(points))
}

/// Body of a messages query.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Messages of one of the caller's chats; replaces their working history.
/// POST /memory/collections/:collection_id/points/by_metadata_messages
pub async fn chat_messages(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(collection_id): Path<String>,
    body: Option<Json<MessagesRequest>>,
) -> ApiResult<Json<PointList>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mut ctx = state.context(&user_id, "").await;
    let points = state
        .chat
        .chat_messages(&mut ctx, &collection_id, request.chat_id.as_deref())
        .await?;
    state.save_history(ctx).await;
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct ChatIdQuery {
    pub chat_id: String,
}

/// Delete a chat.
/// DELETE /delete_chat?chat_id=
pub async fn delete_chat(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Query(query): Query<ChatIdQuery>,
) -> Json<bool> {
    Json(state.chat.delete_chat(&user_id, &query.chat_id).await)
}

#[derive(Debug, Deserialize)]
pub struct RenameQuery {
    pub chat_id: String,
    pub name: String,
}

/// Rename one of the caller's chats.
/// POST /memory/collections/points/changeNameChat?chat_id=&name=
pub async fn rename_chat(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Query(query): Query<RenameQuery>,
) -> Json<bool> {
    Json(
        state
            .chat
            .rename_chat(&user_id, &query.chat_id, &query.name)
            .await,
    )
}

/// Export a chat's messages and name; replaces the caller's working history.
/// POST /giveAll?chat_id=
pub async fn export_chat(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Query(query): Query<ChatIdQuery>,
) -> ApiResult<Json<ChatExport>> {
    let mut ctx = state.context(&user_id, "").await;
    let export = state.chat.export_chat(&mut ctx, &query.chat_id).await?;
    state.save_history(ctx).await;
    Ok(Json(export))
}

/// Body of a conversational turn.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub text: String,
    pub chat_id: Option<String>,
}

/// Run one turn of conversation.
/// POST /message
pub async fn send_message(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(request): Json<MessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let mut ctx = state.context(&user_id, request.text).await;
    ctx.chat_id = request.chat_id;

    let reply = state.chat.respond(&mut ctx).await?;
    state.save_history(ctx).await;

    Ok(Json(MessageResponse {
        text: reply.text,
        chat_id: reply.chat_id,
    }))
}

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ListMessagesQuery, MessageListResponse, SendMessageRequest, UploadQuery};
use crate::services::chat::{page_size, ChatService};

pub struct ChatState {
    pub config: Arc<AppConfig>,
    pub chat: Arc<ChatService>,
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<Arc<ChatState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let message = state.chat.send_message(appointment_id, user.id, request).await?;
    Ok(Json(json!(message)))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<Arc<ChatState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Value>, AppError> {
    let messages = state
        .chat
        .list_messages(appointment_id, user.id, query.limit, query.offset)
        .await?;
    Ok(Json(json!(MessageListResponse {
        count: messages.len(),
        messages,
        limit: page_size(query.limit),
        offset: query.offset.unwrap_or(0),
    })))
}

/// Raw request body is the file; its name comes from the query string.
#[axum::debug_handler]
pub async fn upload_attachment(
    State(state): State<Arc<ChatState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let url = state
        .chat
        .upload_attachment(appointment_id, user.id, &query.filename, content_type, &body)
        .await?;

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "attachment_url": url
    })))
}

#[axum::debug_handler]
pub async fn mark_as_read(
    State(state): State<Arc<ChatState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let updated = state.chat.mark_read(appointment_id, user.id).await?;
    Ok(Json(json!({ "updated": updated })))
}

#[axum::debug_handler]
pub async fn get_unread_count(
    State(state): State<Arc<ChatState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let unread = state.chat.unread_count(appointment_id, user.id).await?;
    Ok(Json(json!({ "unread_count": unread })))
}

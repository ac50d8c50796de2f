use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::VideoSessionListResponse;
use crate::services::VideoSessionService;

pub struct VideoState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<VideoSessionService>,
}

#[axum::debug_handler]
pub async fn create_video_session(
    State(state): State<Arc<VideoState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions.create(appointment_id, user.id).await?;
    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn list_video_sessions(
    State(state): State<Arc<VideoState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let sessions = state
        .sessions
        .list_for_appointment(appointment_id, user.id)
        .await?;
    Ok(Json(json!(VideoSessionListResponse::from(sessions))))
}

#[axum::debug_handler]
pub async fn get_video_session(
    State(state): State<Arc<VideoState>>,
    Path(session_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions.get(session_id, user.id).await?;
    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn start_video_session(
    State(state): State<Arc<VideoState>>,
    Path(session_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions.start(session_id, user.id).await?;
    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn end_video_session(
    State(state): State<Arc<VideoState>>,
    Path(session_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions.end(session_id, user.id).await?;
    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn get_signaling_info(
    State(state): State<Arc<VideoState>>,
    Path(session_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let info = state.sessions.signaling_info(session_id, user.id).await?;
    Ok(Json(json!(info)))
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AuditLogPage, AuditLogQuery};
use crate::services::AuditQueryService;

pub struct AuditState {
    pub config: Arc<AppConfig>,
    pub queries: Arc<AuditQueryService>,
}

#[axum::debug_handler]
pub async fn list_audit_log(
    State(state): State<Arc<AuditState>>,
    Extension(user): Extension<User>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Value>, AppError> {
    let records = state.queries.list(query.into(), user.id).await?;
    Ok(Json(json!(AuditLogPage { count: records.len(), records })))
}

#[axum::debug_handler]
pub async fn list_user_audit_log(
    State(state): State<Arc<AuditState>>,
    Path(user_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Value>, AppError> {
    let records = state
        .queries
        .list_for_user(user_id, query.into(), user.id)
        .await?;
    Ok(Json(json!(AuditLogPage { count: records.len(), records })))
}

#[axum::debug_handler]
pub async fn list_entity_audit_log(
    State(state): State<Arc<AuditState>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let records = state
        .queries
        .list_for_entity(&entity_type, &entity_id, user.id)
        .await?;
    Ok(Json(json!(AuditLogPage { count: records.len(), records })))
}

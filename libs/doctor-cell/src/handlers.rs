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

use crate::models::{AvailableSlotsQuery, CreateSlotRequest, SlotListResponse, UpdateSlotRequest};
use crate::services::SlotService;

pub struct SlotState {
    pub config: Arc<AppConfig>,
    pub slots: Arc<SlotService>,
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<SlotState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let slot = state.slots.create(user.id, request).await?;
    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn list_my_slots(
    State(state): State<Arc<SlotState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let slots = state.slots.list_for_doctor(user.id).await?;
    Ok(Json(json!(SlotListResponse::from(slots))))
}

#[axum::debug_handler]
pub async fn update_slot(
    State(state): State<Arc<SlotState>>,
    Path(slot_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let slot = state.slots.update(slot_id, user.id, request).await?;
    Ok(Json(json!(slot)))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<SlotState>>,
    Path(slot_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    state.slots.delete(slot_id, user.id).await?;
    Ok(Json(json!({ "deleted": true, "slot_id": slot_id })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<SlotState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state.slots.available_slots(doctor_id, query.date).await?;
    Ok(Json(json!(SlotListResponse::from(slots))))
}

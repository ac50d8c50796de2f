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

use crate::models::{CreatePrescriptionRequest, PrescriptionListResponse, UpdatePrescriptionRequest};
use crate::services::PrescriptionService;

pub struct PrescriptionState {
    pub config: Arc<AppConfig>,
    pub prescriptions: Arc<PrescriptionService>,
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<PrescriptionState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let prescription = state.prescriptions.create(appointment_id, user.id, request).await?;
    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<Arc<PrescriptionState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let prescriptions = state
        .prescriptions
        .list_for_appointment(appointment_id, user.id)
        .await?;
    Ok(Json(json!(PrescriptionListResponse {
        count: prescriptions.len(),
        prescriptions,
    })))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<Arc<PrescriptionState>>,
    Path(prescription_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let prescription = state.prescriptions.get(prescription_id, user.id).await?;
    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<Arc<PrescriptionState>>,
    Path(prescription_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let prescription = state
        .prescriptions
        .update(prescription_id, user.id, request)
        .await?;
    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(state): State<Arc<PrescriptionState>>,
    Path(prescription_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    state.prescriptions.delete(prescription_id, user.id).await?;
    Ok(Json(json!({ "deleted": true, "prescription_id": prescription_id })))
}

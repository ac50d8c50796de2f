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

use crate::models::{AppointmentListResponse, BookAppointmentRequest, TransitionRequest};
use crate::services::{AppointmentBookingService, AppointmentLifecycleService};

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .create_appointment(request.for_patient(user.id))
        .await?;
    Ok(Json(json!(appointment)))
}

/// Doctors get their schedule, everyone else their own bookings.
#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = if user.role.as_deref() == Some("doctor") {
        state.booking.list_for_doctor(user.id).await?
    } else {
        state.booking.list_for_patient(user.id).await?
    };
    Ok(Json(json!(AppointmentListResponse::from(appointments))))
}

#[axum::debug_handler]
pub async fn list_upcoming_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.booking.upcoming_for_patient(user.id).await?;
    Ok(Json(json!(AppointmentListResponse::from(appointments))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id, user.id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .transition(appointment_id, user.id, request)
        .await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.cancel(appointment_id, user.id).await?;
    Ok(Json(json!(appointment)))
}

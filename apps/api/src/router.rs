use axum::{routing::get, Router};
use tower_http::services::ServeDir;

use appointment_cell::router::appointment_routes;
use audit_cell::router::audit_routes;
use doctor_cell::router::slot_routes;
use messaging_cell::router::chat_routes;
use prescription_cell::router::prescription_routes;
use video_conferencing_cell::router::video_routes;

use crate::state::CellStates;

pub fn create_router(states: &CellStates, upload_dir: &str) -> Router {
    Router::new()
        .route("/", get(|| async { "Consultation API is running!" }))
        .nest(
            "/appointments",
            appointment_routes(states.appointments.clone()).merge(chat_routes(states.chat.clone())),
        )
        .merge(slot_routes(states.slots.clone()))
        .merge(prescription_routes(states.prescriptions.clone()))
        .merge(video_routes(states.video.clone()))
        .nest("/audit", audit_routes(states.audit.clone()))
        .nest_service("/uploads", ServeDir::new(upload_dir))
}

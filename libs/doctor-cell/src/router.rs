use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SlotState};

pub fn slot_routes(state: Arc<SlotState>) -> Router {
    // Patients browse availability without a token
    let public_routes = Router::new()
        .route("/doctors/{doctor_id}/available-slots", get(handlers::get_available_slots));

    let protected_routes = Router::new()
        .route("/slots", get(handlers::list_my_slots).post(handlers::create_slot))
        .route("/slots/{slot_id}", patch(handlers::update_slot).delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, PrescriptionState};

/// `/appointments/{appointment_id}/prescriptions` for listing and issuing,
/// `/prescriptions/{prescription_id}` for the rest.
pub fn prescription_routes(state: Arc<PrescriptionState>) -> Router {
    Router::new()
        .route(
            "/appointments/{appointment_id}/prescriptions",
            get(handlers::list_prescriptions).post(handlers::create_prescription),
        )
        .route(
            "/prescriptions/{prescription_id}",
            get(handlers::get_prescription)
                .put(handlers::update_prescription)
                .delete(handlers::delete_prescription),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AuditState};

pub fn audit_routes(state: Arc<AuditState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_audit_log))
        .route("/users/{user_id}", get(handlers::list_user_audit_log))
        .route("/entities/{entity_type}/{entity_id}", get(handlers::list_entity_audit_log))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

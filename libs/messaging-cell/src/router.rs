use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, ChatState};
use crate::models::MAX_ATTACHMENT_BYTES;

/// Routes nested under `/appointments/{appointment_id}`.
pub fn chat_routes(state: Arc<ChatState>) -> Router {
    Router::new()
        .route(
            "/{appointment_id}/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route(
            "/{appointment_id}/attachments",
            post(handlers::upload_attachment).layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 1)),
        )
        .route("/{appointment_id}/messages/read", post(handlers::mark_as_read))
        .route("/{appointment_id}/messages/unread-count", get(handlers::get_unread_count))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

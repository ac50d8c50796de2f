use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn video_routes(state: Arc<VideoState>) -> Router {
    Router::new()
        .route(
            "/appointments/{appointment_id}/video-sessions",
            get(list_video_sessions).post(create_video_session),
        )
        .route("/video-sessions/{session_id}", get(get_video_session))
        .route("/video-sessions/{session_id}/start", post(start_video_session))
        .route("/video-sessions/{session_id}/end", post(end_video_session))
        .route("/video-sessions/{session_id}/signaling", get(get_signaling_info))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

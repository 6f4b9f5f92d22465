pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;
use crate::transcription::realtime;

/// Headroom above the audio limit for multipart framing and the text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_audio_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let mut router = Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/process-interview",
            post(handlers::handle_process_interview),
        );

    if state.config.realtime_enabled {
        router = router.route("/ws/transcribe", get(realtime::handle_transcribe_ws));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

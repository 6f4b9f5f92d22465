use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
/// Service metadata and the list of exposed endpoints.
pub async fn root_handler(State(state): State<AppState>) -> Json<Value> {
    let mut endpoints = json!({
        "health": "/health",
        "process_interview": "/process-interview"
    });
    if state.config.realtime_enabled {
        endpoints["transcribe_ws"] = json!("/ws/transcribe");
    }

    Json(json!({
        "message": "Clarity Interview AI API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": endpoints
    }))
}

/// GET /health
/// Liveness plus which provider keys were supplied at startup.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "running",
        "config": {
            "deepgram_configured": !state.config.deepgram_api_key.is_empty(),
            "mistral_configured": !state.config.mistral_api_key.is_empty()
        }
    }))
}

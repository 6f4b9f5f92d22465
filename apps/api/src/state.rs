use std::sync::Arc;

use crate::config::Config;
use crate::interview::InterviewService;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Transcribe-then-suggest pipeline over pluggable provider backends.
    pub interview: Arc<InterviewService>,
}

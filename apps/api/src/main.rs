mod config;
mod errors;
mod interview;
mod routes;
mod state;
mod suggestion;
mod transcription;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::interview::InterviewService;
use crate::routes::build_router;
use crate::state::AppState;
use crate::suggestion::{MistralClient, SuggestionGenerator};
use crate::transcription::DeepgramClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing provider keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clarity Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize provider clients
    let transcriber = DeepgramClient::new(&config)?;
    info!("Deepgram client initialized (model: {})", transcriber.model());

    let suggester = MistralClient::new(&config)?;
    info!("Mistral client initialized (model: {})", suggester.model());

    let interview = Arc::new(InterviewService::new(
        Arc::new(transcriber),
        Arc::new(suggester),
    ));

    info!(
        "Audio uploads limited to {} MB; realtime transcription {}",
        config.max_audio_size_mb,
        if config.realtime_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        interview,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

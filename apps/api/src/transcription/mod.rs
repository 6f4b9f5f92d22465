//! Transcription — turns uploaded audio into a normalized `TranscriptionResult`.
//!
//! `Transcriber` is the seam the interview service depends on; `DeepgramClient`
//! is the production backend. Provider failures are converted into a
//! `success=false` result at this boundary and never propagate further.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod deepgram;
pub mod format;
pub mod realtime;

pub use deepgram::DeepgramClient;
pub use format::AudioFormat;

/// Language requested from the provider for both batch and live transcription.
pub const LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Audio payload is empty")]
    EmptyAudio,

    #[error("Unsupported audio content type: {0}")]
    UnsupportedContentType(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transcription response is missing the transcript field")]
    MissingTranscript,

    #[error("No speech detected in audio")]
    EmptyTranscript,
}

/// Normalized output of one transcription call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub success: bool,
    pub transcript: String,
    /// Provider confidence, clamped to 0.0 – 1.0.
    pub confidence: f64,
    /// (1 - confidence) × 100
    pub wer_estimate: f64,
    pub word_count: usize,
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptionResult {
    /// Builds a successful result; derived fields are computed here so every
    /// backend reports them the same way.
    pub fn completed(
        transcript: String,
        confidence: f64,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            success: true,
            word_count: count_words(&transcript),
            transcript,
            confidence,
            wer_estimate: (1.0 - confidence) * 100.0,
            metadata,
            error: None,
        }
    }

    pub fn failed(error: &TranscriptionError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Whitespace-delimited token count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Calls the provider. Implementations report every failure as an `Err`.
    async fn try_transcribe(
        &self,
        audio: &[u8],
        content_type: &str,
    ) -> Result<TranscriptionResult, TranscriptionError>;

    /// Calls the provider and folds any failure into a `success=false` result.
    async fn transcribe(&self, audio: &[u8], content_type: &str) -> TranscriptionResult {
        match self.try_transcribe(audio, content_type).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Transcription failed: {e}");
                TranscriptionResult::failed(&e)
            }
        }
    }
}

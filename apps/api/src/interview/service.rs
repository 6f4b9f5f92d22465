//! Interview orchestration — transcribe, then suggest, then aggregate.
//!
//! Flow: start timer → transcriber.transcribe() → (on success) suggester.suggest()
//!       → InterviewOutcome with elapsed time.
//!
//! Never fails outward: every provider failure is already folded into the nested
//! result objects by the client wrappers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::suggestion::{InterviewContext, SuggestionGenerator, SuggestionResult};
use crate::transcription::{AudioFormat, Transcriber, TranscriptionError, TranscriptionResult};

/// Aggregated result of one request through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewOutcome {
    pub success: bool,
    pub transcription: TranscriptionResult,
    /// Absent when transcription failed and the suggestion step never ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<SuggestionResult>,
    pub processing_time_seconds: f64,
}

pub struct InterviewService {
    transcriber: Arc<dyn Transcriber>,
    suggester: Arc<dyn SuggestionGenerator>,
}

impl InterviewService {
    pub fn new(transcriber: Arc<dyn Transcriber>, suggester: Arc<dyn SuggestionGenerator>) -> Self {
        Self {
            transcriber,
            suggester,
        }
    }

    /// Runs the two provider calls in sequence. The suggestion call only
    /// happens after a successful transcription with at least one word.
    pub async fn process(
        &self,
        audio: &[u8],
        format: AudioFormat,
        context: &InterviewContext,
    ) -> InterviewOutcome {
        let started = Instant::now();

        info!("Transcribing {} bytes of {}", audio.len(), format.mime_type());
        let mut transcription = self.transcriber.transcribe(audio, format.mime_type()).await;
        if transcription.success && transcription.transcript.trim().is_empty() {
            warn!("Transcription succeeded without any speech");
            transcription = TranscriptionResult::failed(&TranscriptionError::EmptyTranscript);
        }

        if !transcription.success {
            return InterviewOutcome {
                success: false,
                transcription,
                suggestion: None,
                processing_time_seconds: elapsed_seconds(started),
            };
        }

        info!(
            "Generating suggestion for {} word transcript",
            transcription.word_count
        );
        let suggestion = self
            .suggester
            .suggest(&transcription.transcript, context)
            .await;

        let outcome = InterviewOutcome {
            success: suggestion.success,
            transcription,
            suggestion: Some(suggestion),
            processing_time_seconds: elapsed_seconds(started),
        };
        info!(
            "Interview processed: success={}, {:.2}s",
            outcome.success, outcome.processing_time_seconds
        );
        outcome
    }
}

/// Wall-clock seconds since `started`, rounded to two decimals.
fn elapsed_seconds(started: Instant) -> f64 {
    let secs = started.elapsed().as_secs_f64();
    ((secs * 100.0).round() / 100.0).max(0.0)
}

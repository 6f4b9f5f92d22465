//! Response suggestion — asks the generation provider for a suggested answer to
//! the transcribed interview question.
//!
//! `SuggestionGenerator` is the seam used by the interview service;
//! `MistralClient` is the production backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod mistral;
pub mod prompts;

pub use mistral::MistralClient;

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation API returned empty content")]
    EmptyContent,
}

/// Optional candidate context supplied alongside the audio.
/// `None` means "not provided"; `Some("")` is kept as given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterviewContext {
    pub resume: Option<String>,
    pub job_description: Option<String>,
}

/// Normalized output of one generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub success: bool,
    pub response: String,
    pub tokens_used: u32,
    pub model: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionResult {
    pub fn completed(
        response: String,
        tokens_used: u32,
        model: String,
        finish_reason: Option<String>,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(reason) = finish_reason {
            metadata.insert("finish_reason".to_string(), reason);
        }
        metadata.insert(
            "response_length".to_string(),
            response.chars().count().to_string(),
        );
        Self {
            success: true,
            response,
            tokens_used,
            model,
            metadata,
            error: None,
        }
    }

    pub fn failed(model: &str, error: &SuggestionError) -> Self {
        Self {
            success: false,
            model: model.to_string(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    /// Model name reported on every result, including failures.
    fn model(&self) -> &str;

    async fn try_suggest(
        &self,
        transcript: &str,
        context: &InterviewContext,
    ) -> Result<SuggestionResult, SuggestionError>;

    /// Calls the provider and folds any failure into a `success=false` result.
    async fn suggest(&self, transcript: &str, context: &InterviewContext) -> SuggestionResult {
        match self.try_suggest(transcript, context).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Response generation failed: {e}");
                SuggestionResult::failed(self.model(), &e)
            }
        }
    }
}

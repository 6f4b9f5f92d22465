//! Deepgram pre-recorded transcription backend.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::transcription::{
    AudioFormat, Transcriber, TranscriptionError, TranscriptionResult, LANGUAGE,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct ListenResponse {
    #[serde(default)]
    metadata: Option<ListenMetadata>,
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenMetadata {
    request_id: Option<String>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: Option<String>,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct DeepgramErrorBody {
    err_msg: Option<String>,
    message: Option<String>,
}

impl ListenResponse {
    fn first_alternative(&self) -> Option<&Alternative> {
        self.results
            .as_ref()?
            .channels
            .first()?
            .alternatives
            .first()
    }
}

#[derive(Clone)]
pub struct DeepgramClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl DeepgramClient {
    pub fn new(config: &Config) -> Result<Self, TranscriptionError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: config.deepgram_api_key.clone(),
            endpoint: format!("{}/v1/listen", config.deepgram_api_url),
            model: config.deepgram_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn try_transcribe(
        &self,
        audio: &[u8],
        content_type: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }
        let format = AudioFormat::from_mime(content_type)
            .ok_or_else(|| TranscriptionError::UnsupportedContentType(content_type.to_string()))?;

        debug!(
            model = %self.model,
            bytes = audio.len(),
            content_type = format.mime_type(),
            "Sending audio to Deepgram"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("authorization", format!("Token {}", self.api_key))
            .header("content-type", format.mime_type())
            .query(&[
                ("model", self.model.as_str()),
                ("smart_format", "true"),
                ("punctuate", "true"),
                ("language", LANGUAGE),
            ])
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<DeepgramErrorBody>(&body)
                .ok()
                .and_then(|e| e.err_msg.or(e.message))
                .unwrap_or(body);
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ListenResponse = response.json().await?;
        let alternative = body
            .first_alternative()
            .ok_or(TranscriptionError::MissingTranscript)?;
        let transcript = alternative
            .transcript
            .clone()
            .ok_or(TranscriptionError::MissingTranscript)?;
        if transcript.trim().is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("model".to_string(), self.model.clone());
        metadata.insert("language".to_string(), LANGUAGE.to_string());
        if let Some(meta) = &body.metadata {
            if let Some(request_id) = &meta.request_id {
                metadata.insert("request_id".to_string(), request_id.clone());
            }
            if let Some(duration) = meta.duration {
                metadata.insert("duration".to_string(), format!("{duration:.2}"));
            }
        }

        let result = TranscriptionResult::completed(transcript, alternative.confidence, metadata);
        info!(
            "Transcription complete: confidence={:.2}, wer_estimate={:.2}%, words={}",
            result.confidence, result.wer_estimate, result.word_count
        );
        Ok(result)
    }
}

//! Mistral chat-completions backend for interview answer suggestions.
//!
//! One request per call, no retries: a provider failure is reported once and
//! surfaced in-band by the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::suggestion::prompts::{build_system_prompt, build_user_prompt};
use crate::suggestion::{InterviewContext, SuggestionError, SuggestionGenerator, SuggestionResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 300;
const TOP_P: f32 = 0.9;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MistralError {
    message: serde_json::Value,
}

impl MistralError {
    /// Mistral returns `message` as a string for most errors and as a
    /// structured object for validation errors.
    fn into_text(self) -> String {
        match self.message {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct MistralClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl MistralClient {
    pub fn new(config: &Config) -> Result<Self, SuggestionError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: config.mistral_api_key.clone(),
            endpoint: format!("{}/v1/chat/completions", config.mistral_api_url),
            model: config.mistral_model.clone(),
        })
    }
}

#[async_trait]
impl SuggestionGenerator for MistralClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn try_suggest(
        &self,
        transcript: &str,
        context: &InterviewContext,
    ) -> Result<SuggestionResult, SuggestionError> {
        let system = build_system_prompt(context);
        let user = build_user_prompt(transcript);
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        debug!(
            "Generating response for: {}",
            transcript.chars().take(50).collect::<String>()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<MistralError>(&body)
                .map(MistralError::into_text)
                .unwrap_or(body);
            return Err(SuggestionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let tokens_used = body.usage.map(|u| u.total_tokens).unwrap_or_default();
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(SuggestionError::EmptyContent)?;
        let text = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(SuggestionError::EmptyContent)?;

        info!("Response generated: tokens={tokens_used}");

        Ok(SuggestionResult::completed(
            text,
            tokens_used,
            self.model.clone(),
            choice.finish_reason,
        ))
    }
}

//! Axum route handler for the interview pipeline.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::InterviewOutcome;
use crate::state::AppState;
use crate::suggestion::InterviewContext;
use crate::transcription::AudioFormat;

/// A validated multipart upload, ready for the pipeline.
#[derive(Debug)]
pub struct InterviewUpload {
    pub file_name: String,
    pub format: AudioFormat,
    pub audio: Bytes,
    pub context: InterviewContext,
}

/// POST /process-interview
///
/// Multipart fields: `audio` (required file), `resume`, `job_description`.
/// Upload problems are rejected with 400 before any provider call. Provider
/// failures are reported inside the 200 body via the `success` flags.
pub async fn handle_process_interview(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InterviewOutcome>, AppError> {
    let multipart = multipart.map_err(|e| {
        AppError::Validation(format!(
            "Expected a multipart/form-data request: {}",
            e.body_text()
        ))
    })?;

    let upload = read_upload(multipart, state.config.max_audio_bytes())
        .await
        .inspect_err(|e| warn!("Rejected interview upload: {e}"))?;

    info!(
        "Processing interview audio '{}' ({} bytes)",
        upload.file_name,
        upload.audio.len()
    );

    let outcome = state
        .interview
        .process(&upload.audio, upload.format, &upload.context)
        .await;

    Ok(Json(outcome))
}

/// Reads the multipart body and validates the audio part.
pub async fn read_upload(
    mut multipart: Multipart,
    max_audio_bytes: usize,
) -> Result<InterviewUpload, AppError> {
    let mut audio: Option<(String, AudioFormat, Bytes)> = None;
    let mut context = InterviewContext::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("audio") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                // Checked before the body is read so bad uploads are not buffered.
                let format = validate_file_name(&file_name)?;
                let bytes = field.bytes().await?;
                if bytes.len() > max_audio_bytes {
                    return Err(AppError::Validation(format!(
                        "Audio file exceeds the {} MB limit",
                        max_audio_bytes / (1024 * 1024)
                    )));
                }
                audio = Some((file_name, format, bytes));
            }
            Some("resume") => context.resume = Some(field.text().await?),
            Some("job_description") => context.job_description = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, format, audio) =
        audio.ok_or_else(|| AppError::Validation("An 'audio' file is required".to_string()))?;

    Ok(InterviewUpload {
        file_name,
        format,
        audio,
        context,
    })
}

/// Resolves the upload's format from its file name against the allow-list.
pub fn validate_file_name(file_name: &str) -> Result<AudioFormat, AppError> {
    AudioFormat::from_file_name(file_name).ok_or_else(|| {
        AppError::Validation(format!(
            "Invalid file format. Allowed: {}",
            AudioFormat::allowed_list()
        ))
    })
}

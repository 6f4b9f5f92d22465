// Interview processing: multipart upload handling and the transcribe → suggest pipeline.
// Provider calls go through the transcription and suggestion clients only.

pub mod handlers;
pub mod service;

pub use service::{InterviewOutcome, InterviewService};

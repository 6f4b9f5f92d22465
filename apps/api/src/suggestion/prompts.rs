// Prompt text for interview answer suggestions.

use crate::suggestion::InterviewContext;

/// Base system prompt for the interview coach.
pub const COACH_SYSTEM: &str = "You are an expert interview coach helping a candidate \
respond to interview questions. Your responses should be:

1. Concise (2-3 sentences max for quick reading)
2. Actionable (give specific talking points)
3. Structured (use STAR method when appropriate)
4. Natural (sound conversational, not robotic)
5. Confident (project competence and enthusiasm)

Provide the candidate with a suggested response they can use.";

/// Builds the system prompt, appending every provided non-blank context value.
pub fn build_system_prompt(context: &InterviewContext) -> String {
    let resume = non_blank(context.resume.as_deref());
    let job_description = non_blank(context.job_description.as_deref());

    let mut prompt = COACH_SYSTEM.to_string();
    if resume.is_none() && job_description.is_none() {
        return prompt;
    }

    prompt.push_str("\n\nContext:\n");
    if let Some(resume) = resume {
        prompt.push_str(&format!("Candidate's background: {resume}\n"));
    }
    if let Some(job_description) = job_description {
        prompt.push_str(&format!("Job description: {job_description}\n"));
    }
    prompt
}

pub fn build_user_prompt(transcript: &str) -> String {
    format!("Interview question: {transcript}")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

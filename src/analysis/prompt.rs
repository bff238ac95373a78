//! Request construction: transcript validation and prompt text
//!
//! The field names spelled out here are the ones the rescue cascade looks
//! for, so the two must stay in step.

use crate::analysis::error::AnalysisError;
use crate::analysis::types::{AnalysisRequest, LengthLimits, PromptStyle};
use crate::llm_engine::provider::{CompletionRequest, Message, ProviderCapabilities, ResponseFormat};

const BASIC_SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes transcripts. \
Always respond with valid JSON containing exactly two fields: 'summary' and 'sentiment'.";

/// Trim the transcript and enforce the configured length ceilings.
pub fn validate_transcript<'a>(
    transcript: &'a str,
    limits: &LengthLimits,
) -> Result<&'a str, AnalysisError> {
    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Transcript is required".to_string(),
        ));
    }

    let char_count = trimmed.chars().count();

    if let Some(max) = limits.max_chars {
        if char_count > max {
            return Err(AnalysisError::InvalidInput(format!(
                "Transcript too long (max {} characters, got {})",
                max, char_count
            )));
        }
    }

    if let Some(warn) = limits.warn_chars {
        if char_count > warn {
            log::warn!(
                "Transcript is very long ({} characters > {}), consider chunking",
                char_count,
                warn
            );
        }
    }

    Ok(trimmed)
}

fn basic_user_prompt(transcript: &str) -> String {
    format!(
        "Analyze this transcript and return ONLY valid JSON with summary and sentiment fields:\n\n\
        Transcript: {}\n\n\
        Required JSON format:\n\
        {{\"summary\": \"your summary here\", \"sentiment\": \"positive/negative/neutral\"}}",
        transcript
    )
}

fn extended_user_prompt(transcript: &str) -> String {
    format!(
        "Analyze the following transcript and return ONLY a valid JSON object with the specified fields:\n\n\
        Transcript: {}\n\n\
        Instructions:\n\
        1. Provide a concise but comprehensive summary (2-3 sentences)\n\
        2. Determine sentiment: positive, negative, or neutral\n\
        3. Estimate confidence score (0.0-1.0) for sentiment analysis\n\
        4. Extract 3-5 key topics or themes\n\
        5. Count approximate word count\n\n\
        Return format (MUST be valid JSON):\n\
        {{\n  \
        \"summary\": \"brief but comprehensive summary here\",\n  \
        \"sentiment\": \"positive/negative/neutral\",\n  \
        \"confidence_score\": 0.85,\n  \
        \"key_topics\": [\"topic1\", \"topic2\", \"topic3\"],\n  \
        \"word_count\": 150\n\
        }}",
        transcript
    )
}

/// Build the conversation sent to the model.
pub fn build_messages(style: PromptStyle, transcript: &str) -> Vec<Message> {
    match style {
        PromptStyle::Basic => vec![
            Message::system(BASIC_SYSTEM_PROMPT),
            Message::user(basic_user_prompt(transcript)),
        ],
        PromptStyle::Extended => vec![Message::user(extended_user_prompt(transcript))],
    }
}

/// Full request payload; JSON-object mode is requested only when the
/// provider understands it.
pub fn build_completion_request(
    request: &AnalysisRequest<'_>,
    capabilities: &ProviderCapabilities,
) -> CompletionRequest {
    let mut completion = CompletionRequest::new(
        request.config.model.clone(),
        build_messages(request.style, request.transcript),
    );
    completion.temperature = Some(request.config.temperature);
    completion.max_tokens = Some(request.config.max_tokens);
    if capabilities.json_mode {
        completion.response_format = Some(ResponseFormat::json_object());
    }
    completion
}

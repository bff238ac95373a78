use thiserror::Error;

use crate::llm_engine::LlmError;

/// Everything that can stop an analysis from producing a result
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("API key is not configured. Set GROQ_API_KEY in the environment.")]
    MissingCredential,

    #[error("Model request failed after {attempts} attempt(s): {source}")]
    NetworkFailure {
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("Could not parse JSON from response: {raw}")]
    ParseFailure { raw: String },

    #[error("Missing required field '{field}' in response: {object}")]
    SchemaViolation {
        field: &'static str,
        object: serde_json::Value,
    },
}

impl AnalysisError {
    /// Problems with what the caller sent, as opposed to upstream failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::InvalidInput(_))
    }
}

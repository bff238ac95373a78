//! Transcript analysis: prompt construction, model call, reply rescue

pub mod analyzer;
pub mod error;
pub mod prompt;
pub mod rescue;
pub mod types;

pub use analyzer::TranscriptAnalyzer;
pub use error::AnalysisError;
pub use rescue::{rescue, ExtractionStrategy, Rescued};
pub use types::{AnalysisResult, LengthLimits, ModelConfig, PromptStyle, Sentiment};

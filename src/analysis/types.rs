//! Analysis request/result types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Sentiment of a transcript. Closed set; anything else normalizes to Neutral.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Case-insensitive match against the three known labels.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    /// Total mapping from whatever the model put in the `sentiment` field.
    /// The flag is true when the value had to be coerced to Neutral.
    pub fn normalize(value: &serde_json::Value) -> (Self, bool) {
        match value.as_str().and_then(Sentiment::parse_label) {
            Some(sentiment) => (sentiment, false),
            None => (Sentiment::Neutral, true),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of one transcript analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub summary: String,
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
}

impl AnalysisResult {
    pub fn new(summary: impl Into<String>, sentiment: Sentiment) -> Self {
        Self {
            summary: summary.into(),
            sentiment,
            confidence_score: None,
            key_topics: None,
            word_count: None,
        }
    }
}

/// Which prompt variant to send
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// summary + sentiment only
    Basic,
    /// also confidence_score, key_topics, word_count
    #[default]
    Extended,
}

impl PromptStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "basic" => Some(PromptStyle::Basic),
            "extended" => Some(PromptStyle::Extended),
            _ => None,
        }
    }
}

/// Model call settings. The per-attempt timeout belongs to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Transcript length ceilings, in characters. `None` disables a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthLimits {
    /// Longer transcripts are rejected
    pub max_chars: Option<usize>,
    /// Longer transcripts are accepted with a warning
    pub warn_chars: Option<usize>,
}

impl LengthLimits {
    pub fn unlimited() -> Self {
        Self {
            max_chars: None,
            warn_chars: None,
        }
    }
}

impl Default for LengthLimits {
    fn default() -> Self {
        Self {
            max_chars: Some(10_000),
            warn_chars: Some(50_000),
        }
    }
}

/// One analysis call: the transcript plus how to run it
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub transcript: &'a str,
    pub config: &'a ModelConfig,
    pub style: PromptStyle,
}

//! LLM Provider trait and types
//!
//! Defines the narrow "complete chat" interface the analyzer talks to. The
//! retry and parsing layers only ever see this trait, so tests can swap in a
//! scripted provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for LLM operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LlmError {
    /// API key missing or rejected before sending
    AuthenticationFailed(String),
    /// Transport-level failure (connection refused, DNS, reset, ...)
    RequestFailed(String),
    /// The attempt exceeded the per-request timeout
    Timeout(String),
    /// Provider answered with a non-2xx status
    HttpStatus(u16, String),
    /// The request could not be built or serialized
    InvalidRequest(String),
    /// 2xx response whose envelope is not the expected shape
    InvalidResponse(String),
}

impl LlmError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RequestFailed(_) | LlmError::Timeout(_) | LlmError::HttpStatus(..)
        )
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::AuthenticationFailed(msg) => write!(f, "Authentication failed: {}", msg),
            LlmError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            LlmError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            LlmError::HttpStatus(status, body) => {
                write!(f, "Provider returned HTTP {}: {}", status, body)
            }
            LlmError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            LlmError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Output format directive understood by OpenAI-compatible endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// Request for a chat completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier sent to the provider
    pub model: String,
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Maximum tokens to generate (None = provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 = deterministic, 1.0+ = creative)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Forces JSON-object output when the provider supports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            response_format: None,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    /// Generated text content
    pub content: String,
    /// Model that generated the response
    pub model: String,
    /// Number of tokens in the prompt
    pub prompt_tokens: Option<u32>,
    /// Number of tokens generated
    pub completion_tokens: Option<u32>,
    /// Finish reason (stop, length, ...)
    pub finish_reason: Option<String>,
}

/// Capabilities of an LLM provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Accepts `response_format: {"type": "json_object"}`
    pub json_mode: bool,
}

/// The interface every chat backend implements
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai-compat")
    fn provider_name(&self) -> &'static str;

    /// Get provider capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Run a single completion request. No retries happen at this level.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

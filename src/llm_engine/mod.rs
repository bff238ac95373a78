//! LLM Engine module for transcript analysis
//!
//! A single chat-completion capability behind [`LlmProvider`], one concrete
//! OpenAI-compatible backend, and the retry controller wrapped around calls.

pub mod provider;
pub mod providers;
pub mod retry;

pub use provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, MessageRole,
    ProviderCapabilities, ResponseFormat,
};
pub use providers::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use retry::{retry_with_backoff, RetryExhausted, RetryPolicy};

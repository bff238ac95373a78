//! LLM Provider implementations
//!
//! Each provider implements the LlmProvider trait for a specific backend

pub mod openai_compat_provider;

pub use openai_compat_provider::{OpenAiCompatConfig, OpenAiCompatProvider};

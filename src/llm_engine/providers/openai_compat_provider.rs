//! OpenAI-compatible chat completions provider
//!
//! Talks to any endpoint that speaks the `/v1/chat/completions` wire format
//! (Groq by default). Bearer-token authenticated, one POST per call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::llm_engine::provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, ProviderCapabilities,
    ResponseFormat,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Chat request body
#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

impl<'a> From<&'a CompletionRequest> for OpenAiChatRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_format.as_ref(),
        }
    }
}

/// Chat response envelope
#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiReplyMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Applies to each attempt, not to the whole retry sequence
    pub timeout_secs: u64,
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// OpenAI-compatible LLM provider
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::AuthenticationFailed(
                "API key is not configured".to_string(),
            ));
        }
        if config.timeout_secs == 0 {
            return Err(LlmError::InvalidRequest(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

/// Pull the reply text and usage out of a chat-completions body.
fn parse_chat_response(body: &str, requested_model: &str) -> Result<CompletionResponse, LlmError> {
    let envelope: OpenAiChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("Response is not valid JSON: {}", e)))?;

    let choice = envelope
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("Response has no choices".to_string()))?;

    let content = choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| LlmError::InvalidResponse("choices[0].message.content missing".to_string()))?;

    let (prompt_tokens, completion_tokens) = envelope
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((None, None));

    Ok(CompletionResponse {
        content,
        model: envelope.model.unwrap_or_else(|| requested_model.to_string()),
        prompt_tokens,
        completion_tokens,
        finish_reason: choice.finish_reason,
    })
}

fn map_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(err.to_string())
    } else {
        LlmError::RequestFailed(err.to_string())
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &'static str {
        "openai-compat"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { json_mode: true }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = OpenAiChatRequest::from(&request);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            log::debug!("Provider error body: {}", text);
            return Err(LlmError::HttpStatus(status.as_u16(), text));
        }

        parse_chat_response(&text, &request.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_key() {
        let config = OpenAiCompatConfig {
            api_key: "   ".to_string(),
            ..OpenAiCompatConfig::default()
        };
        match OpenAiCompatProvider::new(config) {
            Err(LlmError::AuthenticationFailed(_)) => {}
            other => panic!("Expected AuthenticationFailed, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_new_rejects_zero_timeout() {
        let config = OpenAiCompatConfig {
            api_key: "gsk_test".to_string(),
            timeout_secs: 0,
            ..OpenAiCompatConfig::default()
        };
        assert!(matches!(
            OpenAiCompatProvider::new(config).err(),
            Some(LlmError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "llama-3.1-8b-instant",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"summary\": \"s\", \"sentiment\": \"positive\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }"#;

        let response = parse_chat_response(body, "fallback").unwrap();
        assert_eq!(response.content, r#"{"summary": "s", "sentiment": "positive"}"#);
        assert_eq!(response.model, "llama-3.1-8b-instant");
        assert_eq!(response.prompt_tokens, Some(120));
        assert_eq!(response.completion_tokens, Some(30));
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_chat_response_without_choices() {
        let err = parse_chat_response(r#"{"choices": []}"#, "m").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_chat_response_missing_content() {
        let err = parse_chat_response(r#"{"choices": [{"message": {"role": "assistant"}}]}"#, "m")
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_chat_response_keeps_requested_model() {
        let body = r#"{"choices": [{"message": {"content": "hi"}}]}"#;
        let response = parse_chat_response(body, "llama-3.1-8b-instant").unwrap();
        assert_eq!(response.model, "llama-3.1-8b-instant");
        assert_eq!(response.prompt_tokens, None);
    }

    #[test]
    fn test_wire_request_shape() {
        let mut request = CompletionRequest::new(
            "llama-3.1-8b-instant",
            vec![Message::system("sys"), Message::user("hello")],
        );
        request.temperature = Some(0.1);
        request.max_tokens = Some(1024);
        request.response_format = Some(ResponseFormat::json_object());

        let value = serde_json::to_value(OpenAiChatRequest::from(&request)).unwrap();
        assert_eq!(value["model"], "llama-3.1-8b-instant");
        assert_eq!(value["stream"], false);
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello");
        assert_eq!(value["response_format"]["type"], "json_object");
    }
}

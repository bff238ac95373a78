//! Transcript analyzer: validate, call the model with retries, rescue the reply

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::analysis::error::AnalysisError;
use crate::analysis::prompt::{build_completion_request, validate_transcript};
use crate::analysis::rescue::rescue;
use crate::analysis::types::{AnalysisRequest, AnalysisResult, LengthLimits, ModelConfig, PromptStyle};
use crate::llm_engine::provider::{LlmError, LlmProvider};
use crate::llm_engine::retry::{retry_with_backoff, RetryPolicy};

/// Pause between consecutive transcripts in a batch
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

pub struct TranscriptAnalyzer {
    provider: Arc<dyn LlmProvider>,
    config: ModelConfig,
    limits: LengthLimits,
    style: PromptStyle,
    batch_delay: Duration,
}

impl TranscriptAnalyzer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: ModelConfig,
        limits: LengthLimits,
        style: PromptStyle,
    ) -> Self {
        Self {
            provider,
            config,
            limits,
            style,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.max_retries, self.config.retry_base_delay)
    }

    /// Analyze one transcript.
    pub async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, AnalysisError> {
        let analysis_id = Uuid::new_v4();
        let transcript = validate_transcript(transcript, &self.limits)?;

        log::info!(
            "[{}] Analyzing transcript ({} chars) with {} via {}",
            analysis_id,
            transcript.chars().count(),
            self.config.model,
            self.provider.provider_name()
        );

        let request = AnalysisRequest {
            transcript,
            config: &self.config,
            style: self.style,
        };
        let completion = build_completion_request(&request, &self.provider.capabilities());

        let label = format!("[{}] model request", analysis_id);
        let response = retry_with_backoff(
            &self.retry_policy(),
            &label,
            LlmError::is_retryable,
            |_| self.provider.complete(completion.clone()),
        )
        .await
        .map_err(|exhausted| {
            log::error!("[{}] {}", analysis_id, exhausted);
            AnalysisError::NetworkFailure {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            }
        })?;

        log::debug!("[{}] Raw model reply: {}", analysis_id, response.content);

        let rescued = rescue(&response.content).map_err(|e| {
            log::error!("[{}] Analysis failed: {}", analysis_id, e);
            e
        })?;

        log::info!(
            "[{}] Analysis completed: sentiment={} strategy={} tokens={:?}/{:?}",
            analysis_id,
            rescued.result.sentiment,
            rescued.strategy,
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(rescued.result)
    }

    /// Analyze transcripts one after another, pausing between calls.
    /// Results come back in input order; one failure does not stop the rest.
    pub async fn analyze_batch<S: AsRef<str>>(
        &self,
        transcripts: &[S],
    ) -> Vec<Result<AnalysisResult, AnalysisError>> {
        let total = transcripts.len();
        let mut results = Vec::with_capacity(total);

        for (i, transcript) in transcripts.iter().enumerate() {
            log::info!("Processing transcript {}/{}", i + 1, total);
            results.push(self.analyze(transcript.as_ref()).await);

            if i + 1 < total {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        results
    }
}

/// Scripted provider used by analyzer and HTTP tests
#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::llm_engine::provider::{
        CompletionRequest, CompletionResponse, LlmError, LlmProvider, ProviderCapabilities,
    };

    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub requests: Mutex<Vec<CompletionRequest>>,
        json_mode: bool,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                json_mode: true,
            }
        }

        pub fn replying(content: &str) -> Self {
            Self::new(vec![Ok(content.to_string())])
        }

        pub fn without_json_mode(mut self) -> Self {
            self.json_mode = false;
            self
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                json_mode: self.json_mode,
            }
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let model = request.model.clone();
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::RequestFailed("script exhausted".to_string())));

            reply.map(|content| CompletionResponse {
                content,
                model,
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                finish_reason: Some("stop".to_string()),
            })
        }
    }
}

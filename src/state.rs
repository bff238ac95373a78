// State management for the analyzer service

use std::sync::Arc;

use crate::analysis::{AnalysisError, TranscriptAnalyzer};
use crate::config::AnalyzerConfig;
use crate::llm_engine::{LlmError, LlmProvider, OpenAiCompatProvider};
use crate::storage::ResultLog;

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// None when no API key is configured
    analyzer: Option<Arc<TranscriptAnalyzer>>,
    /// Append-only CSV of successful analyses
    result_log: Arc<ResultLog>,
    model: String,
}

impl AppState {
    pub fn new(analyzer: Option<Arc<TranscriptAnalyzer>>, result_log: Arc<ResultLog>, model: String) -> Self {
        Self {
            analyzer,
            result_log,
            model,
        }
    }

    /// Wire the real provider, analyzer and result log from configuration.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, LlmError> {
        let analyzer = match config.provider_config() {
            Some(provider_config) => {
                let provider: Arc<dyn LlmProvider> =
                    Arc::new(OpenAiCompatProvider::new(provider_config)?);
                let analyzer = TranscriptAnalyzer::new(
                    provider,
                    config.model.clone(),
                    config.limits,
                    config.prompt_style,
                )
                .with_batch_delay(config.batch_delay);
                Some(Arc::new(analyzer))
            }
            None => None,
        };

        Ok(Self::new(
            analyzer,
            Arc::new(ResultLog::new(config.result_log_path.clone())),
            config.model.model.clone(),
        ))
    }

    pub fn analyzer(&self) -> Result<Arc<TranscriptAnalyzer>, AnalysisError> {
        self.analyzer.clone().ok_or(AnalysisError::MissingCredential)
    }

    pub fn result_log(&self) -> Arc<ResultLog> {
        Arc::clone(&self.result_log)
    }

    pub fn api_key_configured(&self) -> bool {
        self.analyzer.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_key_reports_missing_credential() {
        let state = AppState::from_config(&AnalyzerConfig::default()).unwrap();
        assert!(!state.api_key_configured());
        assert!(matches!(state.analyzer(), Err(AnalysisError::MissingCredential)));
    }

    #[test]
    fn test_with_key_builds_analyzer() {
        let config = AnalyzerConfig {
            api_key: Some("gsk_test".to_string()),
            ..AnalyzerConfig::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert!(state.api_key_configured());
        assert_eq!(state.model(), "llama-3.1-8b-instant");
        assert_eq!(state.analyzer().unwrap().config().max_retries, 3);
    }
}

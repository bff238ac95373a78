//! Route handlers
//!
//! - POST /analyze        - analyze one transcript (JSON or form body)
//! - POST /analyze/batch  - analyze several transcripts sequentially
//! - GET  /health         - liveness plus whether an API key is configured

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::http::payload::{BatchPayload, TranscriptPayload};
use crate::state::AppState;

/// Analysis failure rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError(pub AnalysisError);

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Append on a blocking worker. Failures are logged and swallowed; the
/// caller still gets the analysis.
async fn persist(state: &AppState, transcript: &str, result: &AnalysisResult) {
    let result_log = state.result_log();
    let transcript = transcript.trim().to_string();
    let row = result.clone();

    match tokio::task::spawn_blocking(move || result_log.append(&transcript, &row)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("CSV save failed: {:#}", e),
        Err(e) => log::error!("CSV save task failed: {}", e),
    }
}

pub async fn analyze(
    State(state): State<AppState>,
    payload: TranscriptPayload,
) -> Result<Json<AnalysisResult>, ApiError> {
    let analyzer = state.analyzer()?;

    let result = analyzer.analyze(&payload.transcript).await.map_err(|e| {
        log::error!("Analysis failed: {}", e);
        ApiError(e)
    })?;

    persist(&state, &payload.transcript, &result).await;
    Ok(Json(result))
}

pub async fn analyze_batch(
    State(state): State<AppState>,
    payload: BatchPayload,
) -> Result<Json<Value>, ApiError> {
    let analyzer = state.analyzer()?;
    if payload.transcripts.is_empty() {
        return Err(ApiError(AnalysisError::InvalidInput(
            "At least one transcript is required".to_string(),
        )));
    }

    let outcomes = analyzer.analyze_batch(&payload.transcripts).await;

    let mut results = Vec::with_capacity(outcomes.len());
    for (transcript, outcome) in payload.transcripts.iter().zip(outcomes) {
        match outcome {
            Ok(result) => {
                persist(&state, transcript, &result).await;
                results.push(serde_json::to_value(&result).unwrap_or(Value::Null));
            }
            Err(e) => results.push(json!({ "error": e.to_string() })),
        }
    }

    Ok(Json(json!({ "results": results })))
}

/// `groq_api_configured` is the key existing health checks read;
/// `api_key_configured` says the same for non-Groq endpoints.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let configured = state.api_key_configured();
    Json(json!({
        "status": "healthy",
        "groq_api_configured": configured,
        "api_key_configured": configured,
        "model": state.model(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::testing::ScriptedProvider;
    use crate::analysis::{LengthLimits, ModelConfig, PromptStyle, Sentiment, TranscriptAnalyzer};
    use crate::storage::ResultLog;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn state_with(provider: ScriptedProvider) -> (AppState, Arc<ScriptedProvider>, TempDir) {
        let dir = tempdir().unwrap();
        let provider = Arc::new(provider);
        let analyzer = TranscriptAnalyzer::new(
            provider.clone(),
            ModelConfig::default(),
            LengthLimits::default(),
            PromptStyle::Extended,
        )
        .with_batch_delay(std::time::Duration::ZERO);
        let state = AppState::new(
            Some(Arc::new(analyzer)),
            Arc::new(ResultLog::new(dir.path().join("call_analysis.csv"))),
            "llama-3.1-8b-instant".to_string(),
        );
        (state, provider, dir)
    }

    fn payload(text: &str) -> TranscriptPayload {
        TranscriptPayload {
            transcript: text.to_string(),
        }
    }

    fn log_lines(state: &AppState) -> Vec<String> {
        std::fs::read_to_string(state.result_log().path())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_analyze_success_persists_row() {
        let (state, _provider, _dir) = state_with(ScriptedProvider::replying(
            r#"```json
{"summary": "Team celebrated launch.", "sentiment": "Positive"}
```"#,
        ));

        let Json(result) = analyze(State(state.clone()), payload("  We launched!  "))
            .await
            .unwrap();

        assert_eq!(result.summary, "Team celebrated launch.");
        assert_eq!(result.sentiment, Sentiment::Positive);

        let lines = log_lines(&state);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "timestamp,transcript,summary,sentiment");
        assert!(lines[1].ends_with(",We launched!,Team celebrated launch.,positive"));
    }

    #[tokio::test]
    async fn test_analyze_empty_transcript_is_400() {
        let (state, provider, _dir) = state_with(ScriptedProvider::replying("{}"));

        let err = analyze(State(state.clone()), payload("   ")).await.unwrap_err();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.call_count(), 0);
        assert!(log_lines(&state).is_empty());
    }

    #[tokio::test]
    async fn test_analyze_parse_failure_is_500_and_not_logged() {
        let (state, _provider, _dir) = state_with(ScriptedProvider::replying("no json here"));

        let err = analyze(State(state.clone()), payload("hello")).await.unwrap_err();
        assert!(matches!(err.0, AnalysisError::ParseFailure { .. }));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(log_lines(&state).is_empty());
    }

    #[tokio::test]
    async fn test_analyze_without_key_is_500() {
        let dir = tempdir().unwrap();
        let state = AppState::new(
            None,
            Arc::new(ResultLog::new(dir.path().join("call_analysis.csv"))),
            "m".to_string(),
        );

        let err = analyze(State(state), payload("hello")).await.unwrap_err();
        assert!(matches!(err.0, AnalysisError::MissingCredential));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_fail_request() {
        let dir = tempdir().unwrap();
        // a directory where the log file should be makes every append fail
        let blocked = dir.path().join("blocked.csv");
        std::fs::create_dir(&blocked).unwrap();

        let provider = Arc::new(ScriptedProvider::replying(
            r#"{"summary": "s", "sentiment": "neutral"}"#,
        ));
        let analyzer = TranscriptAnalyzer::new(
            provider,
            ModelConfig::default(),
            LengthLimits::default(),
            PromptStyle::Basic,
        );
        let state = AppState::new(
            Some(Arc::new(analyzer)),
            Arc::new(ResultLog::new(blocked)),
            "m".to_string(),
        );

        let Json(result) = analyze(State(state), payload("hello")).await.unwrap();
        assert_eq!(result.sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_batch_mixes_results_and_errors() {
        let (state, _provider, _dir) = state_with(ScriptedProvider::new(vec![
            Ok(r#"{"summary": "first", "sentiment": "negative"}"#.to_string()),
            Ok("garbage".to_string()),
        ]));

        let body = BatchPayload {
            transcripts: vec!["one".to_string(), "".to_string(), "three".to_string()],
        };
        let Json(value) = analyze_batch(State(state.clone()), body).await.unwrap();

        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["summary"], "first");
        assert_eq!(results[0]["sentiment"], "negative");
        assert!(results[1]["error"].as_str().unwrap().contains("required"));
        assert!(results[2]["error"].as_str().unwrap().contains("Could not parse JSON"));
        assert_eq!(log_lines(&state).len(), 2);
    }

    #[tokio::test]
    async fn test_batch_requires_transcripts() {
        let (state, _provider, _dir) = state_with(ScriptedProvider::replying("{}"));
        let err = analyze_batch(State(state), BatchPayload::default())
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_key() {
        let (state, _provider, _dir) = state_with(ScriptedProvider::replying("{}"));
        let Json(value) = health(State(state)).await;
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["groq_api_configured"], true);
        assert_eq!(value["api_key_configured"], true);
        assert_eq!(value["model"], "llama-3.1-8b-instant");
    }
}

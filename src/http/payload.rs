//! Request body extraction for the analyze endpoints
//!
//! Unreadable bodies are rejected with the same `{"error": ...}` shape as
//! analysis failures.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
struct TranscriptBody {
    #[serde(default)]
    transcript: String,
}

/// `transcript` from either a JSON or a urlencoded form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptPayload {
    pub transcript: String,
}

/// Body could not be read; reported to the caller as a 400
#[derive(Debug)]
pub struct PayloadRejection(pub String);

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("Invalid request body: {}", self.0) })),
        )
            .into_response()
    }
}

/// `{"transcripts": [...]}`, JSON only
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchPayload {
    #[serde(default)]
    pub transcripts: Vec<String>,
}

fn is_json_content_type(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for TranscriptPayload
where
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = if is_json_content_type(&req) {
            let Json(body) = Json::<TranscriptBody>::from_request(req, state)
                .await
                .map_err(|e| PayloadRejection(e.body_text()))?;
            body
        } else {
            let Form(body) = Form::<TranscriptBody>::from_request(req, state)
                .await
                .map_err(|e| PayloadRejection(e.body_text()))?;
            body
        };

        Ok(Self {
            transcript: body.transcript,
        })
    }
}

#[async_trait]
impl<S> FromRequest<S> for BatchPayload
where
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<BatchPayload>::from_request(req, state)
            .await
            .map_err(|e| PayloadRejection(e.body_text()))?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    async fn extract(content_type: &str, body: &str) -> Result<TranscriptPayload, PayloadRejection> {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        TranscriptPayload::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_json_body() {
        let payload = extract("application/json", r#"{"transcript": "Hello team"}"#)
            .await
            .unwrap();
        assert_eq!(payload.transcript, "Hello team");
    }

    #[tokio::test]
    async fn test_form_body() {
        let payload = extract(
            "application/x-www-form-urlencoded",
            "transcript=Hello+team%2C+welcome",
        )
        .await
        .unwrap();
        assert_eq!(payload.transcript, "Hello team, welcome");
    }

    #[tokio::test]
    async fn test_missing_field_is_empty() {
        let payload = extract("application/json", r#"{"text": "wrong key"}"#)
            .await
            .unwrap();
        assert_eq!(payload.transcript, "");
    }

    async fn extract_batch(content_type: &str, body: &str) -> Result<BatchPayload, PayloadRejection> {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/analyze/batch")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        BatchPayload::from_request(req, &()).await
    }

    #[tokio::test]
    async fn test_batch_body() {
        let payload = extract_batch("application/json", r#"{"transcripts": ["a", "b"]}"#)
            .await
            .unwrap();
        assert_eq!(payload.transcripts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_batch_rejects_form_and_malformed_bodies() {
        for (content_type, body) in [
            ("application/json", "{not json"),
            ("application/x-www-form-urlencoded", "transcripts=a"),
        ] {
            let rejection = extract_batch(content_type, body).await.unwrap_err();
            assert!(!rejection.0.is_empty());
            assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let rejection = extract("application/json", "{not json").await.unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

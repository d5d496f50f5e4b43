//! HTTP surface: one POST route per beat operation plus a health check.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::beats::{Classification, Segmentation, VisualIdeaSet};
use crate::error::{BeatError, Operation};
use crate::pipeline::BeatService;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub chunked_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizeRequest {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub script_context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn BeatService>,
    pub model: String,
}

/// A failed operation, rendered as `{ "error": ... }` plus the operation's empty payload.
#[derive(Debug)]
pub struct ApiError {
    operation: Operation,
    error: BeatError,
    keyword: String,
}

impl ApiError {
    fn new(operation: Operation, error: BeatError) -> Self {
        Self {
            operation,
            error,
            keyword: String::new(),
        }
    }

    fn bad_body(operation: Operation, rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected request body");
        let error = BeatError::validation("Request body must be a JSON object");
        Self::new(operation, error)
    }

    pub fn status(&self) -> StatusCode {
        if self.error.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.error.user_message(self.operation);
        let body = match self.operation {
            Operation::Segment => json!({ "error": message }),
            Operation::Classify => json!({ "error": message, "keywords": [] }),
            Operation::VisualIdeas => {
                let mut body = serde_json::to_value(VisualIdeaSet::empty(self.keyword))
                    .unwrap_or_else(|_| json!({}));
                body["error"] = json!(message);
                body
            }
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chunk", post(chunk_text))
        .route("/api/analyze", post(analyze_text))
        .route("/api/visualize", post(visualize_keyword))
        .with_state(state)
}

fn request_span(operation: Operation) -> tracing::Span {
    let request_id = Uuid::new_v4();
    tracing::info_span!("request", %request_id, op = operation.as_str())
}

fn log_outcome<T>(result: &Result<T, BeatError>) {
    match result {
        Ok(_) => tracing::info!("request completed"),
        Err(e) if e.is_validation() => tracing::info!(error = %e, "request rejected"),
        Err(e) => tracing::error!(error = %e, "request failed"),
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model.clone(),
    })
}

async fn chunk_text(
    State(state): State<AppState>,
    payload: Result<Json<ChunkRequest>, JsonRejection>,
) -> Result<Json<Segmentation>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_body(Operation::Segment, e))?;
    let text = request.text.unwrap_or_default();

    async move {
        tracing::info!(text_chars = text.chars().count(), "chunk request");
        let result = state.service.segment(&text).await;
        log_outcome(&result);
        result
            .map(Json)
            .map_err(|e| ApiError::new(Operation::Segment, e))
    }
    .instrument(request_span(Operation::Segment))
    .await
}

async fn analyze_text(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Classification>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_body(Operation::Classify, e))?;
    let chunked_text = request.chunked_text.unwrap_or_default();

    async move {
        tracing::info!(
            chunked_chars = chunked_text.chars().count(),
            has_context = request.original_text.is_some(),
            "analyze request"
        );
        let result = state
            .service
            .classify(&chunked_text, request.original_text.as_deref())
            .await;
        log_outcome(&result);
        result
            .map(Json)
            .map_err(|e| ApiError::new(Operation::Classify, e))
    }
    .instrument(request_span(Operation::Classify))
    .await
}

async fn visualize_keyword(
    State(state): State<AppState>,
    payload: Result<Json<VisualizeRequest>, JsonRejection>,
) -> Result<Json<VisualIdeaSet>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_body(Operation::VisualIdeas, e))?;
    let keyword = request.keyword.unwrap_or_default();
    let script_context = request.script_context.unwrap_or_default();

    async move {
        tracing::info!(
            keyword = %keyword,
            context_chars = script_context.chars().count(),
            "visualize request"
        );
        let result = state.service.visual_ideas(&keyword, &script_context).await;
        log_outcome(&result);
        result.map(Json).map_err(|e| ApiError {
            operation: Operation::VisualIdeas,
            error: e,
            keyword,
        })
    }
    .instrument(request_span(Operation::VisualIdeas))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_follows_the_error_kind() {
        let error = BeatError::validation("Text is required");
        let validation = ApiError::new(Operation::Segment, error);
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let error = BeatError::ClassifierUnavailable("timeout".into());
        let unavailable = ApiError::new(Operation::Segment, error);
        assert_eq!(unavailable.status(), StatusCode::BAD_GATEWAY);

        let error = BeatError::MalformedOutput("bad".into());
        let malformed = ApiError::new(Operation::Classify, error);
        assert_eq!(malformed.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn visual_ideas_failure_renders_an_empty_set_for_the_keyword() {
        let error = ApiError {
            operation: Operation::VisualIdeas,
            error: BeatError::MalformedOutput("expected value".into()),
            keyword: "clock".to_string(),
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["concept"], "clock");
        assert_eq!(body["visuals"]["literal"], json!([]));
        assert_eq!(body["visuals"]["icons"], json!([]));
        assert_eq!(
            body["error"],
            "Failed to generate visual ideas. Please try again."
        );
    }

    #[tokio::test]
    async fn classify_validation_failure_carries_empty_keywords() {
        let error = BeatError::validation("Text is required");
        let response = ApiError::new(Operation::Classify, error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        let expected = json!({ "error": "Text is required", "keywords": [] });
        assert_eq!(body, expected);
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let request: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.chunked_text.is_none());
        assert!(request.original_text.is_none());

        let raw = r#"{"keyword":"clock","scriptContext":"Time is short."}"#;
        let request: VisualizeRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.script_context.as_deref(), Some("Time is short."));
    }

    #[test]
    fn analyze_request_omits_absent_context() {
        let request = AnalyzeRequest {
            chunked_text: Some("One.".into()),
            original_text: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "chunkedText": "One." }));
    }
}

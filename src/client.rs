use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::beats::{Classification, Segmentation, VisualIdeaSet};
use crate::commands::{AnalyzeRequest, ChunkRequest, VisualizeRequest};
use crate::error::BeatError;
use crate::pipeline::BeatService;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn unavailable(message: String) -> BeatError {
    BeatError::ClassifierUnavailable(message)
}

/// Talks to a running glyph server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BeatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| unavailable(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BeatError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| unavailable(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| unavailable(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(if status == reqwest::StatusCode::BAD_REQUEST {
                BeatError::Validation(message)
            } else {
                unavailable(message)
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            BeatError::MalformedOutput(format!("Unexpected response from {}: {}", path, e))
        })
    }
}

#[async_trait]
impl BeatService for ApiClient {
    async fn segment(&self, text: &str) -> Result<Segmentation, BeatError> {
        let request = ChunkRequest {
            text: Some(text.to_string()),
        };
        self.post("/api/chunk", &request).await
    }

    async fn classify(
        &self,
        chunked_text: &str,
        original_text: Option<&str>,
    ) -> Result<Classification, BeatError> {
        let request = AnalyzeRequest {
            chunked_text: Some(chunked_text.to_string()),
            original_text: original_text.map(str::to_string),
        };
        self.post("/api/analyze", &request).await
    }

    async fn visual_ideas(
        &self,
        keyword: &str,
        script_context: &str,
    ) -> Result<VisualIdeaSet, BeatError> {
        let request = VisualizeRequest {
            keyword: Some(keyword.to_string()),
            script_context: Some(script_context.to_string()),
        };
        self.post("/api/visualize", &request).await
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{GenerationRequest, ResponseFormat, TextGenerator};
use crate::config::LlmConfig;
use crate::error::GenerationError;

// generateContent response structures
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Google Gemini `generateContent` over REST.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
    timeout_secs: u64,
}

impl GeminiGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                GenerationError::Transport(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

fn build_request_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "system_instruction": {
            "parts": [{ "text": request.system_instruction }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.contents }]
        }]
    });
    if request.format == ResponseFormat::Json {
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });
    }
    body
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;
        let body = build_request_body(request);

        tracing::debug!(
            model = %self.model,
            json = request.format == ResponseFormat::Json,
            content_chars = request.contents.chars().count(),
            "calling model API"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body: super::truncate_for_log(&error_body, 500),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::Transport(format!("Failed to read model API response: {}", e))
            }
        })?;

        extract_text(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            model: "gemini-2.5-flash".into(),
            api_base: "https://example.invalid/v1beta/".into(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
            max_attempts: 1,
        }
    }

    #[test]
    fn json_requests_ask_for_json_mime_type() {
        let body = build_request_body(&GenerationRequest::json("be terse", "hello"));
        let generation_config = &body["generationConfig"];
        assert_eq!(generation_config["responseMimeType"], "application/json");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "be terse");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn text_requests_leave_generation_config_out() {
        let body = build_request_body(&GenerationRequest::text("be terse", "hello"));
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn joins_all_text_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Line one.\n" }, { "text": "Line two." }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Line one.\nLine two.");
    }

    #[test]
    fn blank_candidates_are_an_empty_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        let result = extract_text(response);
        assert!(matches!(result, Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let generator = GeminiGenerator::new(&config(Some("k"))).unwrap();
        assert_eq!(
            generator.endpoint(),
            "https://example.invalid/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let generator = GeminiGenerator::new(&config(None)).unwrap();
        let err = generator
            .generate(&GenerationRequest::text("x", "y"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }
}

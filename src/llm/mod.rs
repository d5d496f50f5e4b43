mod gemini;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::GenerationError;

pub use gemini::GeminiGenerator;

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// One call to the external text-generation capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instruction: &'static str,
    pub contents: String,
    pub format: ResponseFormat,
}

impl GenerationRequest {
    pub fn text(
        system_instruction: &'static str,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction,
            contents: contents.into(),
            format: ResponseFormat::Text,
        }
    }

    pub fn json(
        system_instruction: &'static str,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction,
            contents: contents.into(),
            format: ResponseFormat::Json,
        }
    }
}

/// The hosted language model, reduced to prompt in, text out.
///
/// Implementations are opaque and non-deterministic; callers only rely on the
/// shape checks they apply to the returned text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Model identifier, for logs and the health endpoint.
    fn model(&self) -> &str;
}

/// Retry wrapper: up to `max_attempts` tries with exponential back-off, only for
/// failures that another attempt could fix.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    max_attempts: u32,
) -> Result<String, GenerationError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(2u64.pow(attempt - 1)); // 1s, 2s, 4s
            tracing::info!(
                attempt = attempt + 1,
                max_attempts,
                delay_secs = delay.as_secs(),
                "retrying model call"
            );
            tokio::time::sleep(delay).await;
        }
        match generator.generate(request).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                tracing::warn!(attempt = attempt + 1, error = %err, "model call failed");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Truncate a string to at most `max_chars` characters (UTF-8 safe), for logging raw bodies.
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

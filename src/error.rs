use std::path::PathBuf;
use thiserror::Error;

/// The operation a failure belongs to, used to phrase the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Segment,
    Classify,
    VisualIdeas,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Segment => "segment",
            Operation::Classify => "classify",
            Operation::VisualIdeas => "visual_ideas",
        }
    }
}

/// Errors surfaced by the beat pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BeatError {
    /// Missing or blank required input. Raised before any external call.
    #[error("{0}")]
    Validation(String),
    /// The external call failed (network, timeout, non-success status).
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),
    /// The external call succeeded but its body did not have the expected shape.
    #[error("Malformed classifier output: {0}")]
    MalformedOutput(String),
}

impl BeatError {
    pub fn validation(message: impl Into<String>) -> Self {
        BeatError::Validation(message.into())
    }

    pub fn malformed(context: &str, cause: impl std::fmt::Display) -> Self {
        BeatError::MalformedOutput(format!("{context}: {cause}"))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BeatError::Validation(_))
    }

    /// Short message stored in the session `error` field.
    ///
    /// Validation errors keep their own wording; classifier failures of any kind
    /// read the same to the user.
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            BeatError::Validation(message) => message.clone(),
            BeatError::ClassifierUnavailable(_) | BeatError::MalformedOutput(_) => match operation {
                Operation::Segment => "Failed to chunk text. Please try again.".to_string(),
                Operation::Classify => "Failed to extract keywords. Please try again.".to_string(),
                Operation::VisualIdeas => {
                    "Failed to generate visual ideas. Please try again.".to_string()
                }
            },
        }
    }
}

/// Failures of the external text-generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key not found. Please set the GEMINI_API_KEY environment variable.")]
    MissingApiKey,
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Failed to reach the model API: {0}")]
    Transport(String),
    #[error("Model API error ({status}): {body}")]
    Http { status: u16, body: String },
    #[error("Model API returned no text")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Transport(_) => true,
            GenerationError::Http { status, .. } => *status == 429 || *status >= 500,
            GenerationError::MissingApiKey | GenerationError::EmptyResponse => false,
        }
    }
}

impl From<GenerationError> for BeatError {
    fn from(err: GenerationError) -> Self {
        BeatError::ClassifierUnavailable(err.to_string())
    }
}

/// Failures reading or writing the persisted session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid session file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

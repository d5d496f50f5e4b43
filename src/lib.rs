//! Glyph: split scripts into story beats, label each beat as a phrase or a set
//! of keywords, highlight them in the editor and suggest visuals per keyword.

pub mod beats;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod escape;
pub mod highlight;
pub mod llm;
pub mod navigation;
pub mod pipeline;
pub mod session;
pub mod studio;

#[cfg(test)]
mod test_utils;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::commands::AppState;
use crate::config::{Config, LlmConfig};
use crate::llm::GeminiGenerator;
use crate::pipeline::Pipeline;

/// In-process pipeline backed by the configured Gemini model.
pub fn build_pipeline(llm: &LlmConfig) -> Result<Pipeline> {
    if llm.api_key.is_none() {
        tracing::warn!("{} is not set; model calls will fail", config::API_KEY_ENV);
    }
    let generator = GeminiGenerator::new(llm).context("Failed to set up the model client")?;
    Ok(Pipeline::new(Arc::new(generator), llm.max_attempts))
}

/// Run the HTTP API until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let pipeline = build_pipeline(&config.llm)?;
    let state = AppState {
        model: pipeline.model().to_string(),
        service: Arc::new(pipeline),
    };

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, model = %state.model, "glyph listening");

    axum::serve(listener, commands::router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await
        .context("HTTP server error")
}

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use glyph_lib::config::Config;

/// Serve the Glyph beat API.
#[derive(Parser)]
#[command(name = "glyph", version, about)]
struct Cli {
    /// Model identifier (overrides GLYPH_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Per-request timeout for model calls, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Address to listen on (overrides GLYPH_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("glyph=debug,glyph_lib=debug")
        } else {
            EnvFilter::new("glyph=info,glyph_lib=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::from_env()?;
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(secs) = cli.timeout_secs {
        config.llm.request_timeout = std::time::Duration::from_secs(secs.max(1));
    }
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    glyph_lib::serve(config).await
}

//! Runs a script file through Chunk Text and Extract Keywords and
//! prints what would be highlighted.
//!
//! Usage: cargo run --bin beat_report -- script.txt [--server http://127.0.0.1:3000]

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use glyph_lib::beats::ChunkContent;
use glyph_lib::client::ApiClient;
use glyph_lib::config::Config;
use glyph_lib::highlight::{EditorDocument, ScriptDocument, Span};
use glyph_lib::pipeline::BeatService;
use glyph_lib::session::SessionStore;
use glyph_lib::studio::{Outcome, Studio};

#[derive(Parser)]
#[command(name = "beat_report", about = "Segment, classify and highlight a script file")]
struct Args {
    /// Plain-text script to analyze
    script: PathBuf,

    /// Use a running glyph server instead of calling the model directly
    #[arg(long)]
    server: Option<String>,

    /// Write the report here as well as to stderr
    #[arg(long)]
    report: Option<PathBuf>,

    /// Keep the session (original text and keywords) in the configured session file
    #[arg(long)]
    persist: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("glyph_lib=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;
    let script = script.trim();
    if script.is_empty() {
        bail!("{} is empty", args.script.display());
    }

    let service: Box<dyn BeatService> = match &args.server {
        Some(url) => {
            let timeout = config.llm.request_timeout + Duration::from_secs(5);
            Box::new(ApiClient::new(url.as_str(), timeout)?)
        }
        None => Box::new(glyph_lib::build_pipeline(&config.llm)?),
    };

    let session = if args.persist {
        let configured = config.session_path.clone();
        match configured.or_else(SessionStore::default_path) {
            Some(path) => SessionStore::open(path),
            None => SessionStore::in_memory(),
        }
    } else {
        SessionStore::in_memory()
    };

    let mut studio = Studio::new(ScriptDocument::from_text(script), session);
    let whole = Span::new(0, studio.document().char_len())
        .context("script has no text")?;

    eprintln!("Segmenting {} chars...", script.chars().count());
    let start = Instant::now();
    match studio.chunk_selection(service.as_ref(), whole).await? {
        Outcome::Applied(segmentation) => {
            let beats = segmentation.beats().count();
            let secs = start.elapsed().as_secs_f64();
            eprintln!("Segmented into {} beats in {:.1}s", beats, secs);
        }
        Outcome::Failed(e) => bail!("segment failed: {}", e),
        Outcome::Stale => bail!("segment response was superseded"),
    }

    eprintln!("Classifying...");
    let start = Instant::now();
    let plan = match studio.extract_keywords(service.as_ref(), None).await? {
        Outcome::Applied(plan) => plan,
        Outcome::Failed(e) => bail!("classify failed: {}", e),
        Outcome::Stale => bail!("classify response was superseded"),
    };
    eprintln!("Classified in {:.1}s", start.elapsed().as_secs_f64());

    let mut report = String::new();
    let mut phrases = 0;
    let mut keyword_chunks = 0;
    for chunk in &studio.state().keywords {
        let painted: Vec<String> = plan
            .assignments
            .iter()
            .filter(|a| a.chunk_id == chunk.chunk_id)
            .map(|a| studio.document().text_between(a.span))
            .collect();
        let color = plan
            .assignments
            .iter()
            .find(|a| a.chunk_id == chunk.chunk_id)
            .map(|a| a.color().name())
            .unwrap_or("-");
        match &chunk.content {
            ChunkContent::Phrase(_) => {
                phrases += 1;
                report.push_str(&format!(
                    "PHRASE   [{}] {:<6} \"{}\"\n",
                    chunk.chunk_id, color, chunk.original_text
                ));
            }
            ChunkContent::Keywords(words) => {
                keyword_chunks += 1;
                report.push_str(&format!(
                    "KEYWORDS [{}] {:<6} \"{}\"\n         data: {:?}\n         painted: {:?}\n",
                    chunk.chunk_id, color, chunk.original_text, words, painted
                ));
            }
        }
    }

    report.push_str("\n--- Summary ---\n");
    let total = phrases + keyword_chunks;
    report.push_str(&format!(
        "Chunks: {} ({} phrase, {} keywords)\n",
        total, phrases, keyword_chunks
    ));
    report.push_str(&format!("Highlights: {}\n", plan.assignments.len()));
    report.push_str(&format!("Unlocated chunks: {:?}\n", plan.unlocated));

    eprintln!("\n{}", report);
    if let Some(path) = &args.report {
        std::fs::write(path, &report)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Report saved to {}", path.display());
    }
    Ok(())
}

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::word_count;
use crate::error::BeatError;
use crate::llm::{generate_with_retry, truncate_for_log, GenerationRequest, TextGenerator};

/// Soft upper bound on words per beat.
pub const MAX_BEAT_WORDS: usize = 15;

/// Pieces shorter than this after a clause split are folded into a neighbour.
const MIN_FRAGMENT_WORDS: usize = 3;

/// Below this word-level similarity the segmenter probably rewrote the text.
const FIDELITY_WARN_THRESHOLD: f64 = 0.8;

pub const SEGMENT_INSTRUCTIONS: &str = r#"You are the Story Beat Editor Agent.

Your role:
You specialize in preparing scripts for production by breaking them into clean, meaningful beats.

A beat is a short, self-contained line that captures one idea or moment.

Your job:
- If the script is already broken into lines, keep those splits but clean each line:
  - Trim extra spaces
  - Fix punctuation at the end (commas, periods, ellipses as needed)
  - Preserve the original words and style
- If the script is a single block, split it into beats based on meaning and natural pauses.
- If a beat is too long (over 15 words), split it further by idea.
- Do NOT rewrite or summarize - preserve exact wording.
- Maintain the original order of ideas.

Output:
Return the cleaned beats as a plain text string.
Each beat must be on its own line, with no numbering or bullet points.

Example Input:
Risk management is so important, doesn't matter what position you're in life, because if you have $3,000 in the bank.

Example Output:
Risk management is so important.
Doesn't matter what position you're in life.
Because if you have $3,000 in the bank."#;

/// A clause or sentence boundary: punctuation followed by whitespace.
/// The comma in `$3,000` is not a boundary.
static CLAUSE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;:.!?…]\s+").expect("clause regex"));

static LEADING_BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]\s+)+").expect("bullet regex"));

/// Result of the Segment operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    /// Newline-joined beats.
    pub chunks: String,
    pub original_text: String,
}

impl Segmentation {
    pub fn beats(&self) -> impl Iterator<Item = &str> {
        self.chunks.lines()
    }
}

/// Split `text` into beats through the external model.
///
/// Either a full beat text or an error comes back; partial output is never kept.
pub async fn segment_beats(
    generator: &dyn TextGenerator,
    text: &str,
    max_attempts: u32,
) -> Result<Segmentation, BeatError> {
    if text.trim().is_empty() {
        return Err(BeatError::validation("Text is required"));
    }

    let request = GenerationRequest::text(SEGMENT_INSTRUCTIONS, text);
    let raw = generate_with_retry(generator, &request, max_attempts)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "segment: model call failed");
            BeatError::from(e)
        })?;

    let beats = normalize_beats(&raw);
    if beats.is_empty() {
        tracing::warn!(raw = %truncate_for_log(&raw, 500), "segment: model returned no beats");
        let message = "segmenter returned no beats".to_string();
        return Err(BeatError::MalformedOutput(message));
    }

    let chunks = beats.join("\n");
    let fidelity = word_fidelity(text, &chunks);
    if fidelity < FIDELITY_WARN_THRESHOLD {
        tracing::warn!(fidelity, "segment: beats diverge from the source wording");
    }
    tracing::info!(beats = beats.len(), fidelity, "segment: done");

    Ok(Segmentation {
        chunks,
        original_text: text.to_string(),
    })
}

/// Clean raw segmenter output into beats.
///
/// Trims and collapses whitespace, drops blank lines and bullet markers, splits
/// beats over [`MAX_BEAT_WORDS`] at clause boundaries and normalizes terminal
/// punctuation. Idempotent.
pub fn normalize_beats(raw: &str) -> Vec<String> {
    raw.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .flat_map(|line| split_long_beat(&line))
        .map(|beat| strip_bullets(&beat))
        .filter(|beat| !beat.is_empty())
        .map(|beat| normalize_terminal_punctuation(&beat))
        .collect()
}

fn clean_line(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_bullets(&collapsed)
}

/// A clause split can expose a marker mid-line, so pieces are stripped again.
fn strip_bullets(text: &str) -> String {
    LEADING_BULLETS.replace(text, "").trim().to_string()
}

/// Split one beat that runs over the word limit. Shorter beats come back as-is.
pub fn split_long_beat(line: &str) -> Vec<String> {
    if word_count(line) <= MAX_BEAT_WORDS {
        return vec![line.to_string()];
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for boundary in CLAUSE_BOUNDARY.find_iter(line) {
        // keep the punctuation, drop the whitespace after it
        let punct_end = boundary.start() + boundary.as_str().trim_end().len();
        pieces.push(line[last..punct_end].to_string());
        last = boundary.end();
    }
    if last < line.len() {
        pieces.push(line[last..].to_string());
    }

    merge_fragments(pieces)
        .into_iter()
        .flat_map(|piece| split_evenly(&piece))
        .collect()
}

fn merge_fragments(pieces: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;

    for piece in pieces {
        let piece = match pending.take() {
            Some(prefix) => format!("{} {}", prefix, piece),
            None => piece,
        };
        if word_count(&piece) >= MIN_FRAGMENT_WORDS {
            merged.push(piece);
        } else if let Some(previous) = merged.last_mut() {
            previous.push(' ');
            previous.push_str(&piece);
        } else {
            pending = Some(piece);
        }
    }
    if let Some(rest) = pending {
        merged.push(rest);
    }
    merged
}

/// Last resort for a run-on piece with no clause boundary: equal word groups.
fn split_evenly(piece: &str) -> Vec<String> {
    let words: Vec<&str> = piece.split_whitespace().collect();
    if words.len() <= MAX_BEAT_WORDS {
        return vec![piece.to_string()];
    }
    let groups = words.len().div_ceil(MAX_BEAT_WORDS);
    let base = words.len() / groups;
    let extra = words.len() % groups;

    let mut out = Vec::with_capacity(groups);
    let mut start = 0;
    for group in 0..groups {
        let size = base + usize::from(group < extra);
        out.push(words[start..start + size].join(" "));
        start += size;
    }
    out
}

fn normalize_terminal_punctuation(beat: &str) -> String {
    let trimmed = beat.trim_end();
    match trimmed.chars().last() {
        Some(',') | Some(';') | Some(':') => {
            let mut fixed = trimmed[..trimmed.len() - 1].trim_end().to_string();
            fixed.push('.');
            fixed
        }
        Some(c) if c.is_alphanumeric() => format!("{}.", trimmed),
        _ => trimmed.to_string(),
    }
}

fn normalized_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Word-level similarity between the source and the beats, in `[0, 1]`.
pub fn word_fidelity(source: &str, beats: &str) -> f64 {
    let a = normalized_words(source);
    let b = normalized_words(beats);
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let distance = strsim::generic_levenshtein(&a, &b);
    1.0 - distance as f64 / longest as f64
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::{Chunk, ChunkContent};
use crate::error::BeatError;
use crate::llm::{
    generate_with_retry, strip_code_fence, truncate_for_log, GenerationRequest, TextGenerator,
};

pub const CLASSIFY_INSTRUCTIONS: &str = r#"You are the Visual Hook Analyst Agent.

Your role:
You specialize in analyzing prepared script beats to identify the strongest elements for visual storytelling.

For each beat, you determine whether it should be treated as a complete phrase or broken into a set of keywords.

Your job:
- Read each beat (one per line) from the script.
- If the beat is a complete thought or depends on its word order for meaning -> classify as "phrase" and keep it exactly as written.
- If the beat contains multiple independent ideas or concrete concepts -> classify as "keywords" and return only the core words.
- Remove filler words for keywords ("and", "the", "because", etc.).
- Keep proper nouns, numbers, and important terms exactly as they appear.
- Preserve capitalization and punctuation for phrases.
- Do NOT rewrite meaning.

Output:
Return a valid JSON object with this structure:
{
  "chunks": [
    {
      "chunk_id": number,
      "original_text": "string",
      "type": "keywords" | "phrase",
      "data": ["keyword1", "keyword2"] OR "full phrase as string"
    }
  ]
}

Example Input:
Risk management is so important.
Because if you have $3,000 in the bank.

Example Output:
{
  "chunks": [
    {
      "chunk_id": 1,
      "original_text": "Risk management is so important.",
      "type": "phrase",
      "data": "Risk management is so important."
    },
    {
      "chunk_id": 2,
      "original_text": "Because if you have $3,000 in the bank.",
      "type": "keywords",
      "data": ["$3,000", "you", "bank"]
    }
  ]
}"#;

/// Canonical filler list: words never kept as keywords.
///
/// `you` stays a keyword; its determiner form `your` does not.
pub const FILLER_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "nor", "so", "yet", "because", "if", "then", "than",
    "that", "this", "these", "those", "of", "to", "in", "on", "at", "by", "for", "with", "from",
    "into", "as", "is", "are", "was", "were", "be", "been", "being", "am", "do", "does", "did",
    "have", "has", "had", "it", "its", "your", "my", "our", "their", "his", "her", "just", "very",
    "really",
];

pub fn is_filler_word(word: &str) -> bool {
    let cleaned: String = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    FILLER_WORDS.contains(&cleaned.as_str())
}

/// Result of the Classify operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub keywords: Vec<Chunk>,
    pub chunked_text: String,
    pub original_text: String,
}

// Lenient view of the model's JSON; reconciled into `Chunk`s below.
#[derive(Debug, Deserialize)]
struct RawClassification {
    chunks: Vec<RawChunk>,
}

#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    #[allow(dead_code)]
    chunk_id: Option<Value>,
    #[serde(default)]
    original_text: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawData {
    Text(String),
    List(Vec<String>),
}

/// Label each beat of `chunked_text` as a phrase or a set of keywords.
///
/// `original_text` is context only and defaults to `chunked_text`.
pub async fn classify_beats(
    generator: &dyn TextGenerator,
    chunked_text: &str,
    original_text: Option<&str>,
    max_attempts: u32,
) -> Result<Classification, BeatError> {
    if chunked_text.trim().is_empty() {
        return Err(BeatError::validation("Chunked text is required"));
    }
    let original_text = original_text
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(chunked_text);

    let contents = format!(
        "Text to analyze:\n{}\n\nOriginal Full Script Context:\n{}",
        chunked_text, original_text
    );
    let request = GenerationRequest::json(CLASSIFY_INSTRUCTIONS, contents);
    let raw = generate_with_retry(generator, &request, max_attempts)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "classify: model call failed");
            BeatError::from(e)
        })?;

    let chunks = parse_chunks(&raw).map_err(|e| {
        tracing::warn!(
            error = %e,
            raw = %truncate_for_log(&raw, 500),
            "classify: malformed model output"
        );
        e
    })?;

    for chunk in &chunks {
        tracing::debug!(
            chunk_id = chunk.chunk_id,
            kind = ?chunk.kind(),
            original = %chunk.original_text,
            data = ?chunk.content,
            "classify: chunk"
        );
    }
    tracing::info!(chunks = chunks.len(), "classify: done");

    Ok(Classification {
        keywords: chunks,
        chunked_text: chunked_text.to_string(),
        original_text: original_text.to_string(),
    })
}

/// Parse and reconcile the model's structured output.
///
/// Anything that is not the expected shape fails as a whole; contract slips
/// inside a well-formed chunk (ids, phrase wording, invented or filler
/// keywords) are repaired.
pub fn parse_chunks(raw: &str) -> Result<Vec<Chunk>, BeatError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| BeatError::malformed("invalid JSON", e))?;

    let raw_chunks: Vec<RawChunk> = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value::<RawClassification>(value).map(|c| c.chunks)
    }
    .map_err(|e| BeatError::malformed("unexpected shape", e))?;

    let mut chunks = Vec::with_capacity(raw_chunks.len());
    for (index, raw_chunk) in raw_chunks.into_iter().enumerate() {
        let original_text = raw_chunk.original_text.trim().to_string();
        if original_text.is_empty() {
            tracing::warn!(index, "classify: dropping chunk with empty original_text");
            continue;
        }
        let chunk_id = chunks.len() as u32 + 1;
        let kind = raw_chunk.kind.as_deref();
        let content = reconcile_content(&original_text, kind, raw_chunk.data)?;
        chunks.push(Chunk {
            chunk_id,
            original_text,
            content,
        });
    }
    Ok(chunks)
}

fn reconcile_content(
    original_text: &str,
    kind: Option<&str>,
    data: Option<RawData>,
) -> Result<ChunkContent, BeatError> {
    let is_keywords = match kind.map(|k| k.trim().to_lowercase()) {
        Some(k) if k == "phrase" => false,
        Some(k) if k == "keywords" || k == "keyword" => true,
        Some(other) => {
            let message = format!("unknown chunk type '{other}'");
            return Err(BeatError::MalformedOutput(message));
        }
        None => matches!(data, Some(RawData::List(_))),
    };

    if !is_keywords {
        if let Some(RawData::Text(text)) = &data {
            if text.trim() != original_text {
                tracing::debug!(
                    original = %original_text,
                    data = %text,
                    "classify: phrase data rewritten, using original text"
                );
            }
        }
        return Ok(ChunkContent::Phrase(original_text.to_string()));
    }

    let candidates = match data {
        Some(RawData::List(words)) => words,
        Some(RawData::Text(text)) => vec![text],
        None => Vec::new(),
    };
    let keywords = filter_keywords(original_text, candidates);
    if keywords.is_empty() {
        tracing::debug!(
            original = %original_text,
            "classify: no usable keywords, keeping beat as phrase"
        );
        return Ok(ChunkContent::Phrase(original_text.to_string()));
    }
    Ok(ChunkContent::Keywords(keywords))
}

fn filter_keywords(original_text: &str, candidates: Vec<String>) -> Vec<String> {
    let haystack = original_text.to_lowercase();
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for candidate in candidates {
        let keyword = candidate.trim();
        if keyword.is_empty() || is_filler_word(keyword) {
            continue;
        }
        let lowered = keyword.to_lowercase();
        if !haystack.contains(&lowered) {
            tracing::warn!(
                keyword = %keyword,
                original = %original_text,
                "classify: dropping keyword not found in beat"
            );
            continue;
        }
        if seen.insert(lowered) {
            kept.push(keyword.to_string());
        }
    }
    kept
}

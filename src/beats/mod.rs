pub mod classify;
pub mod ideas;
pub mod segment;

use serde::{Deserialize, Serialize};

pub use classify::{classify_beats, is_filler_word, Classification, FILLER_WORDS};
pub use ideas::{generate_visual_ideas, VisualIdeaSet, Visuals};
pub use segment::{normalize_beats, segment_beats, Segmentation, MAX_BEAT_WORDS};

/// How a beat is carried forward: verbatim, or reduced to salient words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Phrase,
    Keywords,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkContent {
    /// The beat verbatim; always equal to the chunk's `original_text`.
    Phrase(String),
    /// Salient words, each a case-insensitive substring of `original_text`.
    Keywords(Vec<String>),
}

/// A classified beat.
///
/// On the wire this is `{ chunk_id, original_text, type, data }` where `data`
/// is a string for phrases and a list for keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireChunk", into = "WireChunk")]
pub struct Chunk {
    pub chunk_id: u32,
    pub original_text: String,
    pub content: ChunkContent,
}

impl Chunk {
    pub fn phrase(chunk_id: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            chunk_id,
            content: ChunkContent::Phrase(text.clone()),
            original_text: text,
        }
    }

    pub fn keywords(
        chunk_id: u32,
        original_text: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            chunk_id,
            original_text: original_text.into(),
            content: ChunkContent::Keywords(keywords),
        }
    }

    pub fn kind(&self) -> ChunkKind {
        match self.content {
            ChunkContent::Phrase(_) => ChunkKind::Phrase,
            ChunkContent::Keywords(_) => ChunkKind::Keywords,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireData {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireChunk {
    chunk_id: u32,
    original_text: String,
    #[serde(rename = "type")]
    kind: ChunkKind,
    data: WireData,
}

impl TryFrom<WireChunk> for Chunk {
    type Error = String;

    fn try_from(wire: WireChunk) -> Result<Self, Self::Error> {
        let content = match (wire.kind, wire.data) {
            (ChunkKind::Phrase, WireData::Text(text)) => ChunkContent::Phrase(text),
            (ChunkKind::Keywords, WireData::List(words)) => ChunkContent::Keywords(words),
            (ChunkKind::Phrase, WireData::List(_)) => {
                let id = wire.chunk_id;
                return Err(format!("chunk {id}: phrase data must be a string"));
            }
            (ChunkKind::Keywords, WireData::Text(_)) => {
                let id = wire.chunk_id;
                return Err(format!("chunk {id}: keywords data must be a list"));
            }
        };
        Ok(Chunk {
            chunk_id: wire.chunk_id,
            original_text: wire.original_text,
            content,
        })
    }
}

impl From<Chunk> for WireChunk {
    fn from(chunk: Chunk) -> Self {
        let kind = chunk.kind();
        let data = match chunk.content {
            ChunkContent::Phrase(text) => WireData::Text(text),
            ChunkContent::Keywords(words) => WireData::List(words),
        };
        WireChunk {
            chunk_id: chunk.chunk_id,
            original_text: chunk.original_text,
            kind,
            data,
        }
    }
}

/// Number of whitespace-separated words in a beat.
pub fn word_count(line: &str) -> usize {
    line.split_whitespace().count()
}

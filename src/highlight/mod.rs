//! Locating classified beats in the live document and painting them.
//!
//! Every chunk is searched for after the end of the previously located one, so
//! repeated wording later in the script is matched in order. Keywords are only
//! searched inside their own chunk's span, never across the whole document.
//! All resulting highlights go to the document as one batch.

pub mod document;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::beats::{Chunk, ChunkContent};
use crate::escape::literal_matcher;

pub use document::{EditorDocument, HighlightLayer, Mark, ScriptDocument, TextRun, TextRuns};

/// Half-open `[from, to)` range of document offsets, counted in `char`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    /// `None` unless `from < to`.
    pub fn new(from: usize, to: usize) -> Option<Self> {
        (from < to).then_some(Self { from, to })
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.from <= other.from && other.to <= self.to
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.from <= offset && offset < self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Purple,
    Blue,
    Green,
    Yellow,
    Pink,
}

/// Colors handed out round-robin, one per chunk.
pub const PALETTE: [HighlightColor; 5] = [
    HighlightColor::Purple,
    HighlightColor::Blue,
    HighlightColor::Green,
    HighlightColor::Yellow,
    HighlightColor::Pink,
];

impl HighlightColor {
    pub fn name(&self) -> &'static str {
        match self {
            HighlightColor::Purple => "purple",
            HighlightColor::Blue => "blue",
            HighlightColor::Green => "green",
            HighlightColor::Yellow => "yellow",
            HighlightColor::Pink => "pink",
        }
    }

    /// CSS value the editor renders the mark with.
    pub fn css_var(&self) -> String {
        format!("var(--tt-color-highlight-{})", self.name())
    }

    /// Accepts either the CSS variable or the bare color name.
    pub fn from_css(value: &str) -> Option<Self> {
        let value = value.trim();
        let name = value
            .strip_prefix("var(--tt-color-highlight-")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(value);
        PALETTE.into_iter().find(|color| color.name() == name)
    }
}

/// Palette slot for the chunk at position `chunk_index`.
pub fn color_index(chunk_index: usize) -> usize {
    chunk_index % PALETTE.len()
}

/// One span to paint, tagged with the chunk it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightAssignment {
    pub chunk_id: u32,
    pub span: Span,
    pub color_index: usize,
}

impl HighlightAssignment {
    pub fn color(&self) -> HighlightColor {
        PALETTE[self.color_index % PALETTE.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedChunk {
    pub chunk_id: u32,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightPlan {
    pub assignments: Vec<HighlightAssignment>,
    pub located: Vec<LocatedChunk>,
    /// Chunks whose text no longer appears in the document.
    pub unlocated: Vec<u32>,
}

struct Located<'a> {
    span: Span,
    text: &'a str,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// First case-insensitive occurrence of `needle` starting at or after `cursor`.
fn locate<'a>(runs: &[TextRun<'a>], needle: &str, cursor: usize) -> Option<Located<'a>> {
    if needle.trim().is_empty() {
        return None;
    }
    let matcher = match literal_matcher(needle) {
        Ok(matcher) => matcher,
        Err(e) => {
            tracing::warn!(error = %e, "highlight: cannot build matcher");
            return None;
        }
    };

    for run in runs {
        let run_chars = char_len(run.text);
        if run.offset + run_chars <= cursor {
            continue;
        }
        let start = byte_index(run.text, cursor.saturating_sub(run.offset));
        if let Some(found) = matcher.find_at(run.text, start) {
            let from = run.offset + char_len(&run.text[..found.start()]);
            let to = from + char_len(found.as_str());
            return Some(Located {
                span: Span { from, to },
                text: &run.text[found.range()],
            });
        }
    }
    None
}

/// Every occurrence of each keyword inside the located chunk text.
fn keyword_spans(located: &Located<'_>, keywords: &[String]) -> Vec<Span> {
    let mut spans = Vec::new();
    for keyword in keywords {
        if keyword.trim().is_empty() {
            continue;
        }
        let Ok(matcher) = literal_matcher(keyword) else {
            continue;
        };
        for found in matcher.find_iter(located.text) {
            let from = located.span.from + char_len(&located.text[..found.start()]);
            let to = from + char_len(found.as_str());
            if let Some(span) = Span::new(from, to) {
                spans.push(span);
            }
        }
    }
    spans
}

/// Work out every highlight for `chunks` against the document's current text.
///
/// Unlocatable chunks are skipped and reported; they keep their palette slot so
/// the colors of the remaining chunks do not shift.
pub fn plan_highlights<D: TextRuns + ?Sized>(doc: &D, chunks: &[Chunk]) -> HighlightPlan {
    let runs = doc.text_runs();
    let mut plan = HighlightPlan::default();
    let mut cursor = 0;

    for (index, chunk) in chunks.iter().enumerate() {
        let color_index = color_index(index);
        let Some(located) = locate(&runs, &chunk.original_text, cursor) else {
            tracing::warn!(
                chunk_id = chunk.chunk_id,
                text = %chunk.original_text,
                "highlight: chunk not found in document, skipping"
            );
            plan.unlocated.push(chunk.chunk_id);
            continue;
        };
        cursor = located.span.to;
        plan.located.push(LocatedChunk {
            chunk_id: chunk.chunk_id,
            span: located.span,
        });

        match &chunk.content {
            ChunkContent::Phrase(_) => plan.assignments.push(HighlightAssignment {
                chunk_id: chunk.chunk_id,
                span: located.span,
                color_index,
            }),
            ChunkContent::Keywords(keywords) => {
                let mut seen = HashSet::new();
                for span in keyword_spans(&located, keywords) {
                    if seen.insert(span) {
                        plan.assignments.push(HighlightAssignment {
                            chunk_id: chunk.chunk_id,
                            span,
                            color_index,
                        });
                    }
                }
            }
        }
    }

    tracing::debug!(
        assignments = plan.assignments.len(),
        located = plan.located.len(),
        unlocated = plan.unlocated.len(),
        "highlight: planned"
    );
    plan
}

/// Plan and apply in a single document transaction.
pub fn apply_highlights<D: TextRuns + HighlightLayer + ?Sized>(
    doc: &mut D,
    chunks: &[Chunk],
) -> HighlightPlan {
    let plan = plan_highlights(doc, chunks);
    if !plan.assignments.is_empty() {
        doc.apply_highlights(&plan.assignments);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RISK_TEXT: &str = "Risk management is so important.\nDoesn't matter what position you're in life.\nBecause if you have $3,000 in the bank.";

    fn risk_chunks() -> Vec<Chunk> {
        vec![
            Chunk::phrase(1, "Risk management is so important."),
            Chunk::phrase(2, "Doesn't matter what position you're in life."),
            Chunk::keywords(
                3,
                "Because if you have $3,000 in the bank.",
                vec!["$3,000".into(), "you".into(), "bank".into()],
            ),
        ]
    }

    fn risk_doc() -> ScriptDocument {
        ScriptDocument::from_text(RISK_TEXT)
    }

    fn span_text(doc: &ScriptDocument, span: Span) -> String {
        doc.text_between(span)
    }

    fn painted(doc: &ScriptDocument, plan: &HighlightPlan) -> Vec<String> {
        plan.assignments
            .iter()
            .map(|a| span_text(doc, a.span))
            .collect()
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn phrases_cover_their_whole_beat() {
        let doc = risk_doc();
        let plan = plan_highlights(&doc, &risk_chunks());
        assert!(plan.unlocated.is_empty());
        assert_eq!(
            span_text(&doc, plan.assignments[0].span),
            "Risk management is so important."
        );
        assert_eq!(
            span_text(&doc, plan.assignments[1].span),
            "Doesn't matter what position you're in life."
        );
    }

    #[test]
    fn keywords_stay_inside_their_chunk() {
        let doc = risk_doc();
        let plan = plan_highlights(&doc, &risk_chunks());
        let parent = plan.located.iter().find(|l| l.chunk_id == 3).unwrap().span;

        let keyword_texts: Vec<String> = plan
            .assignments
            .iter()
            .filter(|a| a.chunk_id == 3)
            .map(|a| {
                assert!(parent.contains(&a.span));
                span_text(&doc, a.span)
            })
            .collect();
        // "you" in "you're" on line two belongs to another chunk and is not painted
        assert_eq!(keyword_texts, vec!["$3,000", "you", "bank"]);
    }

    #[test]
    fn spans_of_one_chunk_share_a_color_and_neighbours_differ() {
        let doc = risk_doc();
        let plan = plan_highlights(&doc, &risk_chunks());
        for chunk_id in 1..=3u32 {
            let colors: HashSet<usize> = plan
                .assignments
                .iter()
                .filter(|a| a.chunk_id == chunk_id)
                .map(|a| a.color_index)
                .collect();
            assert_eq!(colors.len(), 1);
            let expected = color_index(chunk_id as usize - 1);
            assert_eq!(colors.into_iter().next(), Some(expected));
        }
        assert_eq!(plan.assignments[0].color(), HighlightColor::Purple);
        assert_eq!(plan.assignments[1].color(), HighlightColor::Blue);
        assert_eq!(plan.assignments[2].color(), HighlightColor::Green);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(3, 4)]
    #[case(4, 5)]
    #[case(7, 8)]
    fn consecutive_chunks_get_different_colors(#[case] i: usize, #[case] j: usize) {
        assert_ne!(color_index(i), color_index(j));
    }

    #[test]
    fn palette_wraps_after_five_chunks() {
        assert_eq!(color_index(0), color_index(5));
        assert_eq!(color_index(2), color_index(12));
    }

    #[test]
    fn repeated_beats_are_matched_in_document_order() {
        let doc = ScriptDocument::from_text("Again.\nAgain.\nAgain.");
        let chunks = vec![
            Chunk::phrase(1, "Again."),
            Chunk::phrase(2, "again."),
            Chunk::phrase(3, "Again."),
        ];
        let plan = plan_highlights(&doc, &chunks);
        let spans: Vec<Span> = plan.assignments.iter().map(|a| a.span).collect();
        let expected = vec![
            Span { from: 0, to: 6 },
            Span { from: 7, to: 13 },
            Span { from: 14, to: 20 },
        ];
        assert_eq!(spans, expected);
    }

    #[test]
    fn edited_chunks_are_skipped_and_the_rest_still_highlight() {
        let edited = RISK_TEXT.replace(
            "Doesn't matter what position you're in life.",
            "Position in life is irrelevant.",
        );
        let doc = ScriptDocument::from_text(&edited);
        let plan = plan_highlights(&doc, &risk_chunks());
        assert_eq!(plan.unlocated, vec![2]);
        assert!(plan.assignments.iter().any(|a| a.chunk_id == 1));
        let third: Vec<&HighlightAssignment> = plan
            .assignments
            .iter()
            .filter(|a| a.chunk_id == 3)
            .collect();
        assert_eq!(third.len(), 3);
        // the skipped chunk keeps its palette slot
        assert!(third.iter().all(|a| a.color_index == 2));
    }

    #[test]
    fn nothing_to_paint_is_not_an_error() {
        let mut doc = ScriptDocument::from_text("Completely unrelated text.");
        let before = doc.revision();
        let plan = apply_highlights(&mut doc, &risk_chunks());
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.unlocated, vec![1, 2, 3]);
        assert_eq!(doc.revision(), before);

        let empty = apply_highlights(&mut doc, &[]);
        assert_eq!(empty, HighlightPlan::default());
    }

    #[test]
    fn all_marks_land_in_one_transaction() {
        let mut doc = risk_doc();
        let before = doc.revision();
        let plan = apply_highlights(&mut doc, &risk_chunks());
        assert_eq!(doc.revision(), before + 1);
        assert_eq!(doc.marks().len(), plan.assignments.len());
        assert_eq!(doc.text(), RISK_TEXT);
    }

    #[test]
    fn metacharacters_in_beats_are_matched_literally() {
        let doc = ScriptDocument::from_text("Is it (really) worth $5.99?\nIs it really worth 5x99");
        let chunks = vec![Chunk::phrase(1, "Is it (really) worth $5.99?")];
        let plan = plan_highlights(&doc, &chunks);
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].span, Span { from: 0, to: 27 });
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let doc = ScriptDocument::from_text("Café déjà vu.\nNaïve piñata party.");
        let chunk = Chunk::keywords(1, "Naïve piñata party.", words(&["piñata"]));
        let plan = plan_highlights(&doc, &[chunk]);
        assert_eq!(plan.located[0].span, Span { from: 14, to: 33 });
        assert_eq!(plan.assignments[0].span, Span { from: 20, to: 26 });
        assert_eq!(span_text(&doc, plan.assignments[0].span), "piñata");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let doc = ScriptDocument::from_text("THE BANK ALWAYS WINS.");
        let keywords = words(&["Bank", "wins"]);
        let chunk = Chunk::keywords(1, "the bank always wins.", keywords);
        let plan = plan_highlights(&doc, &[chunk]);
        assert_eq!(painted(&doc, &plan), vec!["BANK", "WINS"]);
    }

    #[test]
    fn repeated_keywords_inside_a_chunk_are_all_painted_once() {
        let text = "Time after time, time runs out.";
        let doc = ScriptDocument::from_text(text);
        let chunk = Chunk::keywords(1, text, words(&["time", "Time", "out"]));
        let plan = plan_highlights(&doc, &[chunk]);
        assert_eq!(painted(&doc, &plan), vec!["Time", "time", "time", "out"]);
    }

    #[test]
    fn colors_round_trip_through_css() {
        for color in PALETTE {
            assert_eq!(HighlightColor::from_css(&color.css_var()), Some(color));
            assert_eq!(HighlightColor::from_css(color.name()), Some(color));
        }
        assert_eq!(HighlightColor::from_css("rgb(0, 0, 0)"), None);
    }

    #[test]
    fn span_requires_from_before_to() {
        assert!(Span::new(3, 3).is_none());
        assert!(Span::new(4, 3).is_none());
        let outer = Span::new(0, 10).unwrap();
        assert!(outer.contains(&Span::new(2, 5).unwrap()));
        assert!(!outer.contains(&Span::new(8, 11).unwrap()));
    }
}

use serde::{Deserialize, Serialize};

use super::{HighlightAssignment, HighlightColor, Span};
use crate::navigation::HighlightClicked;

/// A contiguous stretch of document text starting at `offset` (in chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRun<'a> {
    pub offset: usize,
    pub text: &'a str,
}

/// Read access to the document as ordered text runs.
pub trait TextRuns {
    fn text_runs(&self) -> Vec<TextRun<'_>>;
}

/// Highlight marks are added in batches; a batch is a single undoable transaction.
pub trait HighlightLayer {
    fn apply_highlights(&mut self, batch: &[HighlightAssignment]);
    fn clear_highlights(&mut self);
}

/// The editing capabilities the studio relies on.
pub trait EditorDocument: TextRuns + HighlightLayer {
    /// Text inside `span`; paragraph breaks come back as `\n`.
    fn text_between(&self, span: Span) -> String;

    fn replace_range(&mut self, span: Span, text: &str);

    /// The highlighted text under `offset`, if any.
    fn highlight_at(&self, offset: usize) -> Option<HighlightClicked>;

    fn char_len(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub span: Span,
    pub color: HighlightColor,
}

/// In-memory editor model: paragraphs separated by a single `\n` position.
#[derive(Debug, Clone, Default)]
pub struct ScriptDocument {
    paragraphs: Vec<String>,
    marks: Vec<Mark>,
    revision: u64,
}

impl ScriptDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            paragraphs: text.split('\n').map(str::to_string).collect(),
            marks: Vec::new(),
            revision: 0,
        }
    }

    pub fn text(&self) -> String {
        self.paragraphs.join("\n")
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Bumped once per applied transaction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    /// Grow `span` over every same-colored mark touching it, the way adjacent
    /// marks render as one element.
    fn merged_extent(&self, mut span: Span, color: HighlightColor) -> Span {
        loop {
            let mut grown = false;
            for mark in self.marks.iter().filter(|m| m.color == color) {
                if mark.span.from <= span.to && span.from <= mark.span.to {
                    let next = Span {
                        from: span.from.min(mark.span.from),
                        to: span.to.max(mark.span.to),
                    };
                    if next != span {
                        span = next;
                        grown = true;
                    }
                }
            }
            if !grown {
                return span;
            }
        }
    }
}

impl TextRuns for ScriptDocument {
    fn text_runs(&self) -> Vec<TextRun<'_>> {
        let mut offset = 0;
        self.paragraphs
            .iter()
            .map(|paragraph| {
                let run = TextRun {
                    offset,
                    text: paragraph.as_str(),
                };
                offset += paragraph.chars().count() + 1;
                run
            })
            .collect()
    }
}

impl HighlightLayer for ScriptDocument {
    fn apply_highlights(&mut self, batch: &[HighlightAssignment]) {
        if batch.is_empty() {
            return;
        }
        let len = self.char_len();
        self.marks.extend(
            batch
                .iter()
                .filter(|a| a.span.to <= len && !a.span.is_empty())
                .map(|a| Mark {
                    span: a.span,
                    color: a.color(),
                }),
        );
        self.bump();
    }

    fn clear_highlights(&mut self) {
        if self.marks.is_empty() {
            return;
        }
        self.marks.clear();
        self.bump();
    }
}

impl EditorDocument for ScriptDocument {
    fn text_between(&self, span: Span) -> String {
        self.text()
            .chars()
            .skip(span.from)
            .take(span.len())
            .collect()
    }

    /// Marks before the edit stay, marks after it shift, marks it touches are dropped.
    fn replace_range(&mut self, span: Span, text: &str) {
        let current = self.text();
        let len = current.chars().count();
        let from = span.from.min(len);
        let to = span.to.clamp(from, len);

        let mut next: String = current.chars().take(from).collect();
        next.push_str(text);
        next.extend(current.chars().skip(to));
        self.paragraphs = next.split('\n').map(str::to_string).collect();

        let inserted = text.chars().count();
        self.marks.retain_mut(|mark| {
            if mark.span.to <= from {
                true
            } else if mark.span.from >= to {
                mark.span.from = mark.span.from - to + from + inserted;
                mark.span.to = mark.span.to - to + from + inserted;
                true
            } else {
                false
            }
        });
        self.bump();
    }

    fn highlight_at(&self, offset: usize) -> Option<HighlightClicked> {
        let mark = self
            .marks
            .iter()
            .rev()
            .find(|m| m.span.contains_offset(offset))?;
        let extent = self.merged_extent(mark.span, mark.color);
        Some(HighlightClicked {
            text: self.text_between(extent),
            color: Some(mark.color),
        })
    }

    fn char_len(&self) -> usize {
        let chars: usize = self.paragraphs.iter().map(|p| p.chars().count()).sum();
        chars + self.paragraphs.len().saturating_sub(1)
    }
}

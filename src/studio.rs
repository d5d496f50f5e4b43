//! The editor-side workflow: Chunk Text, Extract Keywords and the keyword
//! detail view, wired to the session store and the live document.
//!
//! Each request is split into a synchronous `begin_*` that validates and raises
//! the busy flag, and a `finish_*` that applies the response. Every `begin_*`
//! hands out a ticket with a fresh sequence number; a response whose ticket is
//! no longer the latest is dropped without touching any state.

use crate::beats::{Classification, Segmentation, VisualIdeaSet};
use crate::error::{BeatError, Operation};
use crate::highlight::{apply_highlights, EditorDocument, HighlightPlan, Span};
use crate::navigation::{decode_slug, Route};
use crate::pipeline::BeatService;
use crate::session::{SessionState, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTicket {
    seq: u64,
    selection: Span,
    text: String,
}

impl SegmentTicket {
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyTicket {
    seq: u64,
    chunked_text: String,
    original_text: String,
}

impl ClassifyTicket {
    pub fn chunked_text(&self) -> &str {
        &self.chunked_text
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }
}

/// How a finished request was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// The request failed; the session error is set and earlier results are kept.
    Failed(BeatError),
    /// A newer request of the same kind was started; the response was dropped.
    Stale,
}

/// What the keyword detail view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordDetail {
    pub keyword: String,
    pub ideas: VisualIdeaSet,
    pub error: Option<String>,
}

/// One editor session: the live document plus the stored session state.
///
/// Both buttons are disabled while `state().is_busy()`, and callers check that
/// before calling `begin_segment` or `begin_classify`. Neither refuses a request
/// while one is in flight; the older response then comes back [`Outcome::Stale`].
pub struct Studio<D: EditorDocument> {
    doc: D,
    session: SessionStore,
    segment_seq: u64,
    classify_seq: u64,
}

impl<D: EditorDocument> Studio<D> {
    pub fn new(doc: D, session: SessionStore) -> Self {
        Self {
            doc,
            session,
            segment_seq: 0,
            classify_seq: 0,
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn begin_segment(&mut self, selection: Span) -> Result<SegmentTicket, BeatError> {
        let text = self.doc.text_between(selection);
        if text.trim().is_empty() {
            return Err(BeatError::validation("Text is required"));
        }

        self.session.set_loading(true);
        self.session.clear_error();
        self.session.set_original_text(text.clone());
        self.segment_seq += 1;

        Ok(SegmentTicket {
            seq: self.segment_seq,
            selection,
            text,
        })
    }

    /// Store the beats and swap them in for the selection they came from.
    pub fn finish_segment(
        &mut self,
        ticket: SegmentTicket,
        result: Result<Segmentation, BeatError>,
    ) -> Outcome<Segmentation> {
        if ticket.seq != self.segment_seq {
            tracing::debug!(
                seq = ticket.seq,
                latest = self.segment_seq,
                "studio: dropping stale segment response"
            );
            return Outcome::Stale;
        }
        self.session.set_loading(false);

        match result {
            Ok(segmentation) => {
                self.session.set_chunks(segmentation.chunks.clone());
                let beats = segmentation.chunks.as_str();
                if self.doc.text_between(ticket.selection) == ticket.text {
                    self.doc.replace_range(ticket.selection, beats);
                } else {
                    tracing::warn!(
                        "studio: selection changed while segmenting, leaving the document as is"
                    );
                }
                Outcome::Applied(segmentation)
            }
            Err(e) => {
                tracing::error!(error = %e, "studio: segment failed");
                self.session.set_error(e.user_message(Operation::Segment));
                Outcome::Failed(e)
            }
        }
    }

    /// Analyze the stored beats, or the selection when nothing has been chunked yet.
    pub fn begin_classify(
        &mut self,
        selection: Option<Span>,
    ) -> Result<ClassifyTicket, BeatError> {
        let selected = selection
            .map(|span| self.doc.text_between(span))
            .unwrap_or_default();
        let state = self.session.state();
        let chunked_text = if state.chunks.trim().is_empty() {
            selected.clone()
        } else {
            state.chunks.clone()
        };
        let stored_original = state.original_text.clone();

        if chunked_text.trim().is_empty() {
            return Err(BeatError::validation("Chunked text is required"));
        }

        self.session.set_analyzing(true);
        self.session.clear_error();
        let original_text = if stored_original.trim().is_empty() {
            self.session.set_original_text(selected.clone());
            selected
        } else {
            stored_original
        };
        self.classify_seq += 1;

        Ok(ClassifyTicket {
            seq: self.classify_seq,
            chunked_text,
            original_text,
        })
    }

    /// Store the chunks and paint them onto the document in one batch.
    pub fn finish_classify(
        &mut self,
        ticket: ClassifyTicket,
        result: Result<Classification, BeatError>,
    ) -> Outcome<HighlightPlan> {
        if ticket.seq != self.classify_seq {
            tracing::debug!(
                seq = ticket.seq,
                latest = self.classify_seq,
                "studio: dropping stale classify response"
            );
            return Outcome::Stale;
        }
        self.session.set_analyzing(false);

        match result {
            Ok(classification) => {
                let plan = apply_highlights(&mut self.doc, &classification.keywords);
                if !plan.unlocated.is_empty() {
                    tracing::warn!(
                        unlocated = ?plan.unlocated,
                        "studio: some chunks could not be highlighted"
                    );
                }
                self.session.set_keywords(classification.keywords);
                Outcome::Applied(plan)
            }
            Err(e) => {
                tracing::error!(error = %e, "studio: classify failed");
                self.session.set_error(e.user_message(Operation::Classify));
                Outcome::Failed(e)
            }
        }
    }

    /// The Chunk Text button.
    pub async fn chunk_selection(
        &mut self,
        service: &dyn BeatService,
        selection: Span,
    ) -> Result<Outcome<Segmentation>, BeatError> {
        let ticket = self.begin_segment(selection)?;
        let result = service.segment(ticket.text()).await;
        Ok(self.finish_segment(ticket, result))
    }

    /// The Extract Keywords button.
    pub async fn extract_keywords(
        &mut self,
        service: &dyn BeatService,
        selection: Option<Span>,
    ) -> Result<Outcome<HighlightPlan>, BeatError> {
        let ticket = self.begin_classify(selection)?;
        let result = service
            .classify(ticket.chunked_text(), Some(ticket.original_text()))
            .await;
        Ok(self.finish_classify(ticket, result))
    }

    /// Where a click at `offset` leads, if it landed on a highlight.
    pub fn click(&self, offset: usize) -> Option<Route> {
        let event = self.doc.highlight_at(offset)?;
        tracing::debug!(text = %event.text, color = ?event.color, "studio: highlight clicked");
        Route::for_click(&event)
    }

    /// Visual ideas for the keyword in a detail route, read against the stored script.
    pub async fn visual_ideas_for(&self, service: &dyn BeatService, slug: &str) -> KeywordDetail {
        let keyword = match decode_slug(slug) {
            Ok(keyword) => keyword,
            Err(e) => {
                return KeywordDetail {
                    keyword: slug.to_string(),
                    ideas: VisualIdeaSet::empty(slug),
                    error: Some(e.user_message(Operation::VisualIdeas)),
                };
            }
        };

        let script = &self.state().original_text;
        match service.visual_ideas(&keyword, script).await {
            Ok(ideas) => KeywordDetail {
                keyword,
                ideas,
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, keyword = %keyword, "studio: visual ideas failed");
                KeywordDetail {
                    ideas: VisualIdeaSet::empty(keyword.clone()),
                    keyword,
                    error: Some(e.user_message(Operation::VisualIdeas)),
                }
            }
        }
    }
}

use async_trait::async_trait;
use std::sync::Arc;

use crate::beats::{self, Classification, Segmentation, VisualIdeaSet};
use crate::error::BeatError;
use crate::llm::TextGenerator;

/// The three beat operations, whether run in-process or over HTTP.
#[async_trait]
pub trait BeatService: Send + Sync {
    async fn segment(&self, text: &str) -> Result<Segmentation, BeatError>;

    async fn classify(
        &self,
        chunked_text: &str,
        original_text: Option<&str>,
    ) -> Result<Classification, BeatError>;

    async fn visual_ideas(
        &self,
        keyword: &str,
        script_context: &str,
    ) -> Result<VisualIdeaSet, BeatError>;
}

/// Runs the operations directly against a text generator.
#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    max_attempts: u32,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, max_attempts: u32) -> Self {
        Self {
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }
}

#[async_trait]
impl BeatService for Pipeline {
    async fn segment(&self, text: &str) -> Result<Segmentation, BeatError> {
        beats::segment_beats(self.generator.as_ref(), text, self.max_attempts).await
    }

    async fn classify(
        &self,
        chunked_text: &str,
        original_text: Option<&str>,
    ) -> Result<Classification, BeatError> {
        let generator = self.generator.as_ref();
        beats::classify_beats(generator, chunked_text, original_text, self.max_attempts).await
    }

    async fn visual_ideas(
        &self,
        keyword: &str,
        script_context: &str,
    ) -> Result<VisualIdeaSet, BeatError> {
        let generator = self.generator.as_ref();
        beats::generate_visual_ideas(generator, keyword, script_context, self.max_attempts).await
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::BeatError;
use crate::llm::{
    generate_with_retry, strip_code_fence, truncate_for_log, GenerationRequest, TextGenerator,
};

/// Minimum suggestions each category should carry.
pub const MIN_IDEAS_PER_CATEGORY: usize = 2;

pub const IDEAS_INSTRUCTIONS: &str = r#"You are the Visualization Ideator Agent.

Your role: You specialize in generating creative, context-aware visual ideas for scripts and stories.

Your job:
- Always use the Script Context above to interpret the meaning of the keyword or phrase.
- If the keyword has multiple meanings, choose the interpretation that best fits the script context.
- Suggest visuals grouped into the following categories:
    1. Literal - Presenting visuals in a straightforward and direct manner without abstract interpretations. This can include showing real-life objects or scenes as they are.
    2. Metaphorical - Using symbols, metaphors, or abstract representations to convey ideas or concepts.
    3. Characters - Incorporating animated characters to convey emotions, actions, or narratives. These characters can be human, animal, or even abstract figures.
    4. Objects - respond with ONLY single keywords (not keyphrases or sentences), e.g., Clock/Time -> Experience.
    5. Icons - Minimal, symbolic visuals that communicate the concept simply.

Guidelines:
- USE SIMPLE ENGLISH and EASY WORDS
- Provide at least 2-3 suggestions for each category.
- Keep suggestions short (3-8 words each).
- Avoid repeating the same idea in multiple categories.
- If multiple keywords are provided, you may combine them for richer suggestions.

Output: Return a valid JSON object with this structure:
{
  "concept": "original keyword or phrase",
  "visuals": {
    "literal": ["idea1", "idea2", ...],
    "metaphorical": ["idea1", "idea2", ...],
    "characters": ["idea1", "idea2", ...],
    "objects": ["idea1", "idea2", ...],
    "icons": ["idea1", "idea2", ...]
  }
}"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visuals {
    #[serde(default)]
    pub literal: Vec<String>,
    #[serde(default)]
    pub metaphorical: Vec<String>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub icons: Vec<String>,
}

impl Visuals {
    /// Categories in their fixed order.
    pub fn categories(&self) -> [(&'static str, &Vec<String>); 5] {
        [
            ("literal", &self.literal),
            ("metaphorical", &self.metaphorical),
            ("characters", &self.characters),
            ("objects", &self.objects),
            ("icons", &self.icons),
        ]
    }

    fn categories_mut(&mut self) -> [&mut Vec<String>; 5] {
        [
            &mut self.literal,
            &mut self.metaphorical,
            &mut self.characters,
            &mut self.objects,
            &mut self.icons,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.categories().iter().all(|(_, ideas)| ideas.is_empty())
    }
}

/// Categorized visual suggestions for one keyword or phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualIdeaSet {
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub visuals: Visuals,
}

impl VisualIdeaSet {
    /// Valid-shaped set with every category empty; returned alongside errors.
    pub fn empty(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            visuals: Visuals::default(),
        }
    }
}

pub async fn generate_visual_ideas(
    generator: &dyn TextGenerator,
    keyword: &str,
    script_context: &str,
    max_attempts: u32,
) -> Result<VisualIdeaSet, BeatError> {
    if keyword.trim().is_empty() {
        return Err(BeatError::validation("Keyword is required"));
    }
    if script_context.trim().is_empty() {
        return Err(BeatError::validation("Script context cannot be empty"));
    }

    let contents = format!(
        "Keyword/Phrase: {keyword}\n\nScript Context: {script_context}"
    );
    let request = GenerationRequest::json(IDEAS_INSTRUCTIONS, contents);
    let raw = generate_with_retry(generator, &request, max_attempts)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, keyword, "ideas: model call failed");
            BeatError::from(e)
        })?;

    parse_visual_ideas(keyword, &raw).map_err(|e| {
        tracing::warn!(
            error = %e,
            raw = %truncate_for_log(&raw, 500),
            "ideas: malformed model output"
        );
        e
    })
}

/// Parse the model's JSON and drop blanks and ideas repeated across categories.
pub fn parse_visual_ideas(keyword: &str, raw: &str) -> Result<VisualIdeaSet, BeatError> {
    let mut set: VisualIdeaSet = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| BeatError::malformed("invalid visual ideas", e))?;

    if set.concept.trim().is_empty() {
        set.concept = keyword.to_string();
    }

    let mut seen = HashSet::new();
    for ideas in set.visuals.categories_mut() {
        let taken = std::mem::take(ideas);
        *ideas = taken
            .into_iter()
            .map(|idea| idea.trim().to_string())
            .filter(|idea| !idea.is_empty() && seen.insert(idea.to_lowercase()))
            .collect();
    }

    if set.visuals.is_empty() {
        let message = "no visual ideas returned".to_string();
        return Err(BeatError::MalformedOutput(message));
    }
    for (name, ideas) in set.visuals.categories() {
        if ideas.len() < MIN_IDEAS_PER_CATEGORY {
            tracing::warn!(
                category = name,
                count = ideas.len(),
                "ideas: category is under-filled"
            );
        }
    }
    Ok(set)
}

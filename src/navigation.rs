//! Turning a click on a highlight into a keyword detail route and back.

use serde::{Deserialize, Serialize};

use crate::error::BeatError;
use crate::highlight::HighlightColor;

/// Emitted when the user clicks a highlighted span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightClicked {
    pub text: String,
    pub color: Option<HighlightColor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Editor,
    /// Detail view for a single keyword, carried URL-encoded in the path.
    Keyword(String),
}

impl Route {
    /// Route for a highlight click; blank highlights go nowhere.
    pub fn for_click(event: &HighlightClicked) -> Option<Route> {
        let text = event.text.trim();
        (!text.is_empty()).then(|| Route::Keyword(text.to_string()))
    }

    pub fn path(&self) -> String {
        match self {
            Route::Editor => "/".to_string(),
            Route::Keyword(keyword) => format!("/keyword/{}", urlencoding::encode(keyword)),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        if path.is_empty() || path == "/" {
            return Some(Route::Editor);
        }
        let slug = path.strip_prefix("/keyword/")?;
        if slug.is_empty() || slug.contains('/') {
            return None;
        }
        decode_slug(slug).ok().map(Route::Keyword)
    }
}

/// Decode the keyword slug from a detail route.
pub fn decode_slug(slug: &str) -> Result<String, BeatError> {
    let decoded = urlencoding::decode(slug)
        .map_err(|_| BeatError::validation("Invalid keyword slug"))?;
    let keyword = decoded.trim();
    if keyword.is_empty() {
        return Err(BeatError::validation("Keyword is required"));
    }
    Ok(keyword.to_string())
}

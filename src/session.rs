//! Session state for one editing session.
//!
//! The store is a plain container. `original_text` and `keywords` are written
//! to disk on every change and restored on the next start; everything else
//! starts fresh.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::beats::Chunk;
use crate::error::SessionError;

/// File name under the data directory.
pub const SESSION_FILE: &str = "glyph-script-context.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub original_text: String,
    /// Beat text, one beat per line.
    pub chunks: String,
    pub keywords: Vec<Chunk>,
    pub is_loading: bool,
    pub is_analyzing: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// The editor controls stay disabled while either request is in flight.
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_analyzing
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    #[serde(default)]
    original_text: String,
    #[serde(default)]
    keywords: Vec<Chunk>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    state: SessionState,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Restore the persisted subset from `path`. A missing file starts empty; an
    /// unreadable one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let persisted = match load_persisted(&path) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => PersistedSession::default(),
            Err(e) => {
                tracing::warn!(error = %e, "session: ignoring unreadable session file");
                PersistedSession::default()
            }
        };
        tracing::debug!(
            path = %path.display(),
            keywords = persisted.keywords.len(),
            "session: restored"
        );

        Self {
            state: SessionState {
                original_text: persisted.original_text,
                keywords: persisted.keywords,
                ..SessionState::default()
            },
            path: Some(path),
        }
    }

    /// `<data_dir>/glyph/glyph-script-context.json`, when the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("glyph").join(SESSION_FILE))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_original_text(&mut self, text: impl Into<String>) {
        self.state.original_text = text.into();
        self.persist();
    }

    pub fn set_chunks(&mut self, chunks: impl Into<String>) {
        self.state.chunks = chunks.into();
    }

    pub fn set_keywords(&mut self, keywords: Vec<Chunk>) {
        self.state.keywords = keywords;
        self.persist();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    pub fn set_analyzing(&mut self, analyzing: bool) {
        self.state.is_analyzing = analyzing;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.state.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    pub fn clear_all(&mut self) {
        self.state = SessionState::default();
        self.persist();
    }

    /// Write the persisted subset now.
    pub fn save(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let persisted = PersistedSession {
            original_text: self.state.original_text.clone(),
            keywords: self.state.keywords.clone(),
        };
        save_persisted(path, &persisted)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "session: failed to persist");
        }
    }
}

fn load_persisted(path: &Path) -> Result<Option<PersistedSession>, SessionError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path)(e)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| SessionError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SessionError {
    let path = path.to_path_buf();
    move |source| SessionError::Io { path, source }
}

fn save_persisted(path: &Path, persisted: &PersistedSession) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let payload = serde_json::to_vec_pretty(persisted).map_err(|source| SessionError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, payload).map_err(io_error(&tmp_path))?;
    std::fs::rename(&tmp_path, path).map_err(io_error(path))?;
    Ok(())
}

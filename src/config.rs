//! Runtime configuration from the environment.
//!
//! Every setting has a default except the API key. Without a key the server
//! still starts; model calls then fail as classifier-unavailable.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "GLYPH_MODEL";
pub const API_BASE_ENV: &str = "GLYPH_API_BASE";
pub const TIMEOUT_ENV: &str = "GLYPH_TIMEOUT_SECS";
pub const MAX_RETRIES_ENV: &str = "GLYPH_MAX_RETRIES";
pub const BIND_ENV: &str = "GLYPH_BIND";
pub const SESSION_PATH_ENV: &str = "GLYPH_SESSION_PATH";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Settings for the external text-generation call.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Total tries per call, including the first.
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub llm: LlmConfig,
    pub session_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), Path::new(".env"))
    }

    /// Build from an arbitrary variable lookup; `env_file` is consulted for the API key only.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, env_file: &Path) -> Result<Self> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut llm = LlmConfig {
            api_key: api_key(&lookup, env_file),
            ..LlmConfig::default()
        };

        if let Some(model) = non_empty(MODEL_ENV) {
            llm.model = model;
        }
        if let Some(base) = non_empty(API_BASE_ENV) {
            llm.api_base = base;
        }
        if let Some(secs) = non_empty(TIMEOUT_ENV) {
            let secs: u64 = parse_setting(TIMEOUT_ENV, &secs, "a whole number of seconds")?;
            llm.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(attempts) = non_empty(MAX_RETRIES_ENV) {
            let attempts: u32 = parse_setting(MAX_RETRIES_ENV, &attempts, "a positive number")?;
            llm.max_attempts = attempts.max(1);
        }

        let bind_value = non_empty(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = parse_setting(BIND_ENV, &bind_value, "a socket address")?;

        Ok(Self {
            bind,
            llm,
            session_path: non_empty(SESSION_PATH_ENV).map(PathBuf::from),
        })
    }
}

fn parse_setting<T>(name: &str, value: &str, expected: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{} must be {}, got {:?}", name, expected, value))
}

fn clean_key(raw: &str) -> Option<String> {
    let key = raw.trim().trim_matches('"').trim_matches('\'').to_string();
    (!key.is_empty()).then_some(key)
}

/// The API key from the environment, falling back to a `.env` file.
fn api_key(lookup: &impl Fn(&str) -> Option<String>, env_file: &Path) -> Option<String> {
    if let Some(key) = lookup(API_KEY_ENV).as_deref().and_then(clean_key) {
        return Some(key);
    }

    let contents = std::fs::read_to_string(env_file).ok()?;
    let prefix = format!("{}=", API_KEY_ENV);
    contents
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(&prefix))
        .find_map(clean_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_lookup(lookup(&[]), &dir.path().join(".env")).unwrap();
        assert_eq!(config.bind, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(60));
        assert_eq!(config.llm.max_attempts, 2);
        assert!(config.llm.api_key.is_none());
        assert!(config.session_path.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_lookup(
            lookup(&[
                (API_KEY_ENV, "\"secret\""),
                (MODEL_ENV, "gemini-2.5-pro"),
                (TIMEOUT_ENV, "15"),
                (MAX_RETRIES_ENV, "0"),
                (BIND_ENV, "0.0.0.0:8080"),
                (SESSION_PATH_ENV, "/tmp/glyph.json"),
            ]),
            &dir.path().join(".env"),
        )
        .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.llm.request_timeout, Duration::from_secs(15));
        assert_eq!(config.llm.max_attempts, 1);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.session_path, Some(PathBuf::from("/tmp/glyph.json")));
    }

    #[test]
    fn api_key_falls_back_to_the_env_file() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "OTHER=1\nGEMINI_API_KEY=\"from-file\"\n").unwrap();
        let config = Config::from_lookup(lookup(&[(API_KEY_ENV, "  ")]), &env_file).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");

        let vars = lookup(&[(TIMEOUT_ENV, "soon")]);
        let err = Config::from_lookup(vars, &env_file).unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_ENV));

        let vars = lookup(&[(BIND_ENV, "nowhere")]);
        let err = Config::from_lookup(vars, &env_file).unwrap_err();
        assert!(err.to_string().contains(BIND_ENV));
    }
}

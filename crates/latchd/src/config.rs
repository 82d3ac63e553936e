//! TOML configuration, layered with environment variable overrides for the
//! handful of values worth overriding without editing a file (policy
//! directory, activity log path, bind secret).

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading `latchd`'s configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("reading {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    /// The config file is not valid TOML for this shape.
    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// A session to register at startup, mirroring the in-process
/// registration interface's arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionEntry {
    /// Session id; must match `^[A-Za-z0-9_-]+$`.
    pub id: String,
    /// Harness id (`claude`, `codex`, `openclaw`, …).
    pub harness_id: String,
    /// Base policy id this session resolves against.
    pub policy_id: String,
}

/// `latchd`'s on-disk configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of `<id>.yaml` policy documents.
    pub policy_dir: PathBuf,
    /// Path to the append-only activity log (JSONL).
    pub activity_log_path: PathBuf,
    /// Sessions to register at startup.
    pub sessions: Vec<SessionEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy_dir: PathBuf::from("./policies"),
            activity_log_path: PathBuf::from("./activity.jsonl"),
            sessions: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults for any
    /// field a partial file omits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply environment-variable overrides on top of a loaded config.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("LATCHD_POLICY_DIR") {
            self.policy_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("LATCHD_ACTIVITY_LOG") {
            self.activity_log_path = PathBuf::from(path);
        }
        self
    }
}

//! Harness Configuration Generator: turns an effective policy into the
//! native enforcement artefacts each supported harness understands.
//!
//! These artefacts are ancillary — decisions still flow through the
//! authorization server at runtime — but they close the loop for harnesses
//! that also apply their own static gating before ever calling out.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod claude;
pub mod codex;
pub mod droid;
pub mod openclaw;
mod session_id;

use std::path::{Path, PathBuf};

use latch_policy::PolicyDocument;
use thiserror::Error;

pub use session_id::validate_session_id;

/// Errors raised while generating harness artefacts.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// `sessionId` failed the `^[A-Za-z0-9_-]+$` check.
    #[error("invalid session id {0:?}: must match ^[A-Za-z0-9_-]+$")]
    InvalidSessionId(String),
    /// A tool-rule pattern uses a wildcard shape the generator cannot
    /// express in the target harness's native rule syntax.
    #[error("unsupported rule pattern {0:?}")]
    UnsupportedPattern(String),
    /// Underlying filesystem operation failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// Existing generated file could not be parsed to merge into.
    #[error("parse: {0}")]
    Parse(String),
}

/// Loopback authorization callback parameters, when authz is wired up for
/// the generated harness config.
#[derive(Debug, Clone)]
pub struct AuthzOptions {
    /// Port the authorization server is bound to.
    pub port: u16,
    /// Session id to address in generated callback URLs.
    pub session_id: String,
    /// Shared bearer secret. Never written into generated files; only
    /// used to fill in environment-variable references the harness
    /// reads at its own runtime.
    pub secret: String,
}

impl AuthzOptions {
    /// Base URL for the authorization server's loopback HTTP endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// Paths to every artefact a generator wrote.
pub type ArtefactPaths = Vec<PathBuf>;

/// One supported harness, each with its own generation strategy.
pub trait HarnessConfigGenerator {
    /// Write enforcement artefacts for `policy` into `dir`, optionally
    /// wiring a loopback authorization callback.
    ///
    /// # Errors
    ///
    /// Returns an error if `authz`'s session id is invalid, a rule cannot
    /// be expressed, or a write fails.
    fn enforce(
        &self,
        policy: &PolicyDocument,
        dir: &Path,
        authz: Option<&AuthzOptions>,
    ) -> Result<ArtefactPaths, GeneratorError>;

    /// Extra launch flags to append to the harness's own invocation.
    fn launch_flags(&self, policy: &PolicyDocument) -> Vec<String>;
}

/// Closed set of harnesses the generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessKind {
    /// Claude Code.
    Claude,
    /// OpenAI Codex CLI.
    Codex,
    /// OpenClaw.
    OpenClaw,
    /// Factory Droid or any harness without a dedicated generator.
    DroidOrUnknown,
}

impl HarnessKind {
    /// Classify a harness id string (case-insensitive) into a kind.
    #[must_use]
    pub fn from_harness_id(id: &str) -> Self {
        match id.to_ascii_lowercase().as_str() {
            "claude" | "claude-code" => Self::Claude,
            "codex" => Self::Codex,
            "openclaw" => Self::OpenClaw,
            _ => Self::DroidOrUnknown,
        }
    }

    /// Resolve the generator implementing this harness kind's strategy.
    #[must_use]
    pub fn generator(self) -> Box<dyn HarnessConfigGenerator> {
        match self {
            Self::Claude => Box::new(claude::ClaudeGenerator),
            Self::Codex => Box::new(codex::CodexGenerator),
            Self::OpenClaw => Box::new(openclaw::OpenClawGenerator),
            Self::DroidOrUnknown => Box::new(droid::DroidGenerator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_kind_classification_is_case_insensitive() {
        assert_eq!(HarnessKind::from_harness_id("Claude"), HarnessKind::Claude);
        assert_eq!(HarnessKind::from_harness_id("CODEX"), HarnessKind::Codex);
        assert_eq!(HarnessKind::from_harness_id("openclaw"), HarnessKind::OpenClaw);
        assert_eq!(HarnessKind::from_harness_id("droid"), HarnessKind::DroidOrUnknown);
        assert_eq!(HarnessKind::from_harness_id("something-else"), HarnessKind::DroidOrUnknown);
    }
}

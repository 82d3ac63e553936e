//! Session id validation shared by every generator: guards against path
//! traversal and shell metacharacters before a session id is interpolated
//! into a generated file or shell script.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::GeneratorError;

static SESSION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Validate a session id against `^[A-Za-z0-9_-]+$`, rejecting `/`, `..`,
/// and shell metacharacters before it is interpolated anywhere.
///
/// # Errors
///
/// Returns `GeneratorError::InvalidSessionId` if the id does not match.
pub fn validate_session_id(session_id: &str) -> Result<(), GeneratorError> {
    if SESSION_ID.is_match(session_id) {
        Ok(())
    } else {
        Err(GeneratorError::InvalidSessionId(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_alphanumeric_ids_are_valid() {
        assert!(validate_session_id("S1").is_ok());
        assert!(validate_session_id("session_abc-123").is_ok());
    }

    #[test]
    fn path_traversal_and_shell_metacharacters_are_rejected() {
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id("a/b").is_err());
        assert!(validate_session_id("a;rm -rf /").is_err());
        assert!(validate_session_id("a$(whoami)").is_err());
        assert!(validate_session_id("").is_err());
    }
}

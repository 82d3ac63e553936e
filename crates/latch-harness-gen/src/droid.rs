//! Droid and unknown harnesses: no config files, just launch flags that
//! disable the harness's own gating since the core owns enforcement.

use std::path::Path;

use latch_policy::PolicyDocument;

use crate::{ArtefactPaths, AuthzOptions, GeneratorError, HarnessConfigGenerator};

/// Generator for Factory Droid and any harness with no dedicated strategy.
#[derive(Debug, Default)]
pub struct DroidGenerator;

impl HarnessConfigGenerator for DroidGenerator {
    fn enforce(
        &self,
        _policy: &PolicyDocument,
        _dir: &Path,
        _authz: Option<&AuthzOptions>,
    ) -> Result<ArtefactPaths, GeneratorError> {
        Ok(Vec::new())
    }

    fn launch_flags(&self, _policy: &PolicyDocument) -> Vec<String> {
        vec!["--auto".to_string(), "high".to_string(), "--skip-permissions-unsafe".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn droid_writes_no_files_and_appends_fixed_flags() {
        let gen = DroidGenerator;
        let policy = PolicyDocument::new("p1", "t");
        let dir = tempfile::tempdir().unwrap();
        assert!(gen.enforce(&policy, dir.path(), None).unwrap().is_empty());
        assert_eq!(gen.launch_flags(&policy), vec!["--auto", "high", "--skip-permissions-unsafe"]);
    }
}

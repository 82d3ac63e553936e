//! Policy Store: persist/retrieve `PolicyDocument`s by id, and list all.
//! Named at interface only by the component overview; this module supplies
//! the trait plus a file-backed implementation adapted from the engine's
//! former YAML-loading routine, and an in-memory implementation for tests.

use crate::model::PolicyDocument;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by a `PolicyStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested policy id is not present.
    #[error("policy not found: {0}")]
    NotFound(String),
    /// Underlying filesystem operation failed.
    #[error("policy store io error: {0}")]
    Io(#[from] std::io::Error),
    /// The on-disk document failed to parse.
    #[error("malformed policy document {path}: {source}")]
    Malformed {
        /// Path of the offending file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Persist/retrieve policy documents by id.
pub trait PolicyStore: Send + Sync {
    /// Fetch a policy by id.
    fn get(&self, id: &str) -> Result<PolicyDocument, StoreError>;
    /// List every stored policy, in an implementation-defined but stable
    /// order (used as the `policies` input to `computeStrictestBaseline`).
    fn list(&self) -> Result<Vec<PolicyDocument>, StoreError>;
    /// Create or overwrite a policy document.
    fn put(&self, policy: PolicyDocument) -> Result<(), StoreError>;
    /// Remove a policy document; no-op if absent.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory `PolicyStore`, used in tests and as the default when no
/// on-disk store is configured.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    inner: RwLock<BTreeMap<String, PolicyDocument>>,
}

impl InMemoryPolicyStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get(&self, id: &str) -> Result<PolicyDocument, StoreError> {
        self.inner
            .read()
            .expect("policy store lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<PolicyDocument>, StoreError> {
        Ok(self.inner.read().expect("policy store lock poisoned").values().cloned().collect())
    }

    fn put(&self, policy: PolicyDocument) -> Result<(), StoreError> {
        self.inner.write().expect("policy store lock poisoned").insert(policy.id.clone(), policy);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.write().expect("policy store lock poisoned").remove(id);
        Ok(())
    }
}

/// Directory of one-YAML-file-per-policy documents (`<id>.yaml`), with an
/// in-memory cache refreshed on every mutation. Suited to the supervisor's
/// on-disk policy directory.
pub struct FilePolicyStore {
    dir: PathBuf,
    cache: RwLock<BTreeMap<String, PolicyDocument>>,
}

impl FilePolicyStore {
    /// Open (without yet reading) a directory of policy YAML files.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or listed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let store = Self { dir, cache: RwLock::new(BTreeMap::new()) };
        store.reload()?;
        Ok(store)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.yaml"))
    }

    fn reload(&self) -> Result<(), StoreError> {
        let mut loaded = BTreeMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let doc: PolicyDocument = serde_yaml::from_str(&contents).map_err(|source| {
                StoreError::Malformed { path: path.display().to_string(), source }
            })?;
            loaded.insert(doc.id.clone(), doc);
        }
        *self.cache.write().expect("policy cache poisoned") = loaded;
        Ok(())
    }
}

impl PolicyStore for FilePolicyStore {
    fn get(&self, id: &str) -> Result<PolicyDocument, StoreError> {
        self.cache
            .read()
            .expect("policy cache poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<PolicyDocument>, StoreError> {
        Ok(self.cache.read().expect("policy cache poisoned").values().cloned().collect())
    }

    fn put(&self, policy: PolicyDocument) -> Result<(), StoreError> {
        let serialized = serde_yaml::to_string(&policy).expect("PolicyDocument always serializes");
        let tmp = self.path_for(&policy.id).with_extension("yaml.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, self.path_for(&policy.id))?;
        self.cache.write().expect("policy cache poisoned").insert(policy.id.clone(), policy);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        self.cache.write().expect("policy cache poisoned").remove(id);
        Ok(())
    }
}

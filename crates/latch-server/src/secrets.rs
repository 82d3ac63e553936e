//! Secret vault interface, named at interface only by the component
//! overview ("the secret vault, accessed through a small resolve-by-key
//! interface"). The concrete vault lives outside the core; this crate only
//! needs the narrow `resolve` contract to serve `/secrets/resolve`.

use std::collections::BTreeMap;

/// Resolve opaque secret keys to values.
pub trait SecretVault: Send + Sync {
    /// Resolve every key in `keys`, omitting any that are unknown.
    fn resolve(&self, keys: &[String]) -> BTreeMap<String, String>;
}

/// Development/test vault backed by `LATCH_SECRET_<KEY>` environment
/// variables. Production deployments supply their own `SecretVault` backed
/// by the desktop shell's real vault.
#[derive(Debug, Default)]
pub struct EnvSecretVault;

impl SecretVault for EnvSecretVault {
    fn resolve(&self, keys: &[String]) -> BTreeMap<String, String> {
        keys.iter()
            .filter_map(|k| {
                let var = format!("LATCH_SECRET_{k}");
                std::env::var(var).ok().map(|v| (k.clone(), v))
            })
            .collect()
    }
}

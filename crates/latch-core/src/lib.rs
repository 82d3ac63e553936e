//! Shared primitives used across the latch workspace: monotonic ids, a
//! deterministic clock abstraction, and the validated identifier newtypes
//! that appear at crate boundaries (`SessionId`, `ApprovalId`).

#![deny(unsafe_code)]

/// Version of the latch core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ids {
    //! ID utilities: monotonic event ids and trace ids.

    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    /// Generate a new monotonic identifier (starts at 1).
    pub fn next_monotonic_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Milliseconds since UNIX epoch (for timestamps).
    pub fn now_ms() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
    }

    /// Opaque trace identifier (UUID v4 string), used for request correlation
    /// in logs and activity records.
    pub fn new_trace_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a short opaque token suitable for session ids and approval
    /// ids: URL-safe, no padding, derived from a v4 UUID.
    pub fn new_opaque_token() -> String {
        Uuid::new_v4().simple().to_string()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn monotonic_increments() {
            let a = next_monotonic_id();
            let b = next_monotonic_id();
            assert!(b > a);
        }

        #[test]
        fn trace_id_format() {
            let t = new_trace_id();
            assert_eq!(t.len(), 36);
            assert!(t.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
        }

        #[test]
        fn opaque_token_is_alnum() {
            let t = new_opaque_token();
            assert_eq!(t.len(), 32);
            assert!(t.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}

pub mod clock {
    //! Deterministic time abstraction so approval-timeout logic can be
    //! tested without sleeping. `SystemClock` is used in production;
    //! `VirtualClock` gives tests explicit control over elapsed time.

    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, OnceLock, RwLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Clock abstraction for deterministic time in approval/server control paths.
    /// Returns milliseconds since UNIX epoch.
    pub trait Clock: Send + Sync {
        /// Current time in milliseconds.
        fn now_ms(&self) -> u64;
    }

    /// System (production) clock. Wraps `SystemTime`.
    #[derive(Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now_ms(&self) -> u64 {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system clock before epoch")
                .as_millis() as u64
        }
    }

    /// Virtual (deterministic/test) clock with manual control.
    #[derive(Debug)]
    pub struct VirtualClock {
        inner: AtomicU64,
    }

    impl VirtualClock {
        /// Create a new virtual clock seeded at `start_ms`.
        #[must_use]
        pub fn new(start_ms: u64) -> Self {
            Self { inner: AtomicU64::new(start_ms) }
        }

        /// Advance the virtual clock by `delta_ms`.
        pub fn advance_ms(&self, delta_ms: u64) {
            self.inner.fetch_add(delta_ms, Ordering::SeqCst);
        }

        /// Set the virtual clock to an absolute ms value.
        pub fn set_ms(&self, value: u64) {
            self.inner.store(value, Ordering::SeqCst);
        }
    }

    impl Clock for VirtualClock {
        fn now_ms(&self) -> u64 {
            self.inner.load(Ordering::SeqCst)
        }
    }

    static PROCESS_CLOCK: OnceLock<RwLock<Arc<dyn Clock>>> = OnceLock::new();

    fn registry() -> &'static RwLock<Arc<dyn Clock>> {
        PROCESS_CLOCK.get_or_init(|| RwLock::new(Arc::new(SystemClock)))
    }

    /// Get the current process-wide Clock (Arc clone). Defaults to `SystemClock`.
    pub fn process_clock() -> Arc<dyn Clock> {
        registry().read().expect("clock registry poisoned").clone()
    }

    /// Set/swap the process-wide Clock. Used by tests and by components that
    /// run under a `VirtualClock` to exercise timeout logic deterministically.
    pub fn set_process_clock(clock: Arc<dyn Clock>) {
        *registry().write().expect("clock registry poisoned") = clock;
    }

}

pub mod token {
    //! Validated opaque identifier newtypes shared across crate boundaries.

    use std::fmt;

    /// A token (session id or approval id) must be non-empty and composed
    /// solely of `[A-Za-z0-9_-]`, matching what every harness-generated
    /// config file and URL path segment can carry without escaping.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct OpaqueToken(String);

    /// Error returned when a candidate string is not a valid opaque token.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("invalid token {0:?}: must be non-empty and match [A-Za-z0-9_-]+")]
    pub struct InvalidToken(pub String);

    impl OpaqueToken {
        /// Generate a fresh random token.
        #[must_use]
        pub fn generate() -> Self {
            Self(crate::ids::new_opaque_token())
        }

        /// Borrow the token as a plain string slice.
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl TryFrom<String> for OpaqueToken {
        type Error = InvalidToken;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            let valid = !value.is_empty()
                && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if valid {
                Ok(Self(value))
            } else {
                Err(InvalidToken(value))
            }
        }
    }

    impl TryFrom<&str> for OpaqueToken {
        type Error = InvalidToken;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            Self::try_from(value.to_string())
        }
    }

    impl fmt::Display for OpaqueToken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Identifier for a registered harness session.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SessionId(pub OpaqueToken);

    /// Identifier for a pending approval.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ApprovalId(pub OpaqueToken);

    macro_rules! token_newtype {
        ($name:ident) => {
            impl $name {
                /// Generate a fresh random identifier.
                #[must_use]
                pub fn generate() -> Self {
                    Self(OpaqueToken::generate())
                }

                /// Borrow as a plain string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl TryFrom<String> for $name {
                type Error = InvalidToken;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    OpaqueToken::try_from(value).map(Self)
                }
            }

            impl TryFrom<&str> for $name {
                type Error = InvalidToken;

                fn try_from(value: &str) -> Result<Self, Self::Error> {
                    OpaqueToken::try_from(value).map(Self)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        };
    }

    token_newtype!(SessionId);
    token_newtype!(ApprovalId);

}

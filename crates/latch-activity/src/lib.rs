//! Activity Store: an append-only log of terminal policy decisions, with
//! range queries for the anomaly-detection radar (an external consumer,
//! named at interface only).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use latch_policy::{ActionClass, Risk, Verdict};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Monotonic activity-event identifier.
pub type EventId = u64;

/// Errors raised by an `ActivityStore` implementation.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// Underlying filesystem operation failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// A record failed to (de)serialize.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A single terminal decision, emitted exactly once per completed
/// `/authorize` request (invariant I1). Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Monotonic id assigned on append.
    pub id: EventId,
    /// Session the decision concerned.
    pub session_id: String,
    /// Millis since epoch.
    pub timestamp: u64,
    /// Tool name (or synthetic `_codex:<type>` for `/notify` observations).
    pub tool_name: String,
    /// Action class the tool was classified as.
    pub action_class: ActionClass,
    /// Risk tier.
    pub risk: Risk,
    /// Terminal verdict.
    pub decision: Verdict,
    /// Human-readable reason, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Harness the session is bound to.
    pub harness_id: String,
}

/// Append-only activity log, plus range queries.
pub trait ActivityStore: Send + Sync {
    /// Append a new event; the store assigns and returns the monotonic id.
    fn append(&self, event: ActivityEvent) -> Result<EventId, ActivityError>;
    /// Read events with id in `[start, end)` (half-open range).
    fn read_range(&self, start: EventId, end: EventId) -> Result<Vec<ActivityEvent>, ActivityError>;
}

/// A simple JSONL-backed append-only activity log.
#[derive(Debug)]
pub struct JsonlActivityStore {
    path: String,
    next_id: AtomicU64,
}

impl JsonlActivityStore {
    /// Create or open a log at `path`. Scans the existing file (if any) to
    /// resume monotonic id assignment from the highest id seen.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ActivityError> {
        let p = path.as_ref();
        if !p.exists() {
            OpenOptions::new().create(true).write(true).truncate(true).open(p)?;
        }
        let mut max_id = 0u64;
        let file = File::open(p)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            if let Ok(rec) = serde_json::from_str::<ActivityEvent>(&line) {
                max_id = max_id.max(rec.id);
            }
        }
        Ok(Self { path: p.to_string_lossy().into_owned(), next_id: AtomicU64::new(max_id + 1) })
    }
}

impl ActivityStore for JsonlActivityStore {
    fn append(&self, mut event: ActivityEvent) -> Result<EventId, ActivityError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        event.id = id;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let line = serde_json::to_string(&event)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(id)
    }

    fn read_range(&self, start: EventId, end: EventId) -> Result<Vec<ActivityEvent>, ActivityError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let rec: ActivityEvent = serde_json::from_str(&line)?;
            if rec.id >= start && rec.id < end {
                out.push(rec);
            }
        }
        Ok(out)
    }
}

/// In-memory `ActivityStore`, used in tests.
#[derive(Debug, Default)]
pub struct InMemoryActivityStore {
    inner: std::sync::Mutex<Vec<ActivityEvent>>,
    next_id: AtomicU64,
}

impl InMemoryActivityStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: std::sync::Mutex::new(Vec::new()), next_id: AtomicU64::new(1) }
    }
}

impl ActivityStore for InMemoryActivityStore {
    fn append(&self, mut event: ActivityEvent) -> Result<EventId, ActivityError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        event.id = id;
        self.inner.lock().expect("activity store lock poisoned").push(event);
        Ok(id)
    }

    fn read_range(&self, start: EventId, end: EventId) -> Result<Vec<ActivityEvent>, ActivityError> {
        Ok(self
            .inner
            .lock()
            .expect("activity store lock poisoned")
            .iter()
            .filter(|e| e.id >= start && e.id < end)
            .cloned()
            .collect())
    }
}

//! Policy resolution and evaluation for the latch policy-enforcement core.
//!
//! This crate owns the data model (`PolicyDocument` and its parts), the
//! Policy Store interface, the Policy Resolver (`resolver::compute_strictest_baseline`,
//! `resolver::resolve_policy`), and the Tool Classifier & Rule Evaluator
//! (`evaluator::evaluate`). Both the resolver and the evaluator are pure
//! functions: no I/O, no global state, safe to call from any thread.
//!
//! Decision taxonomy:
//! - `Verdict::Allow` — proceed, optionally with `needs_prompt` set.
//! - `Verdict::Deny` — block the action; always carries a `reason`.
//!
//! Evaluation precedence (see `evaluator` for the full pipeline):
//! 1. Action-class gate (bash/write/network flags)
//! 2. Per-harness tool rules
//! 3. MCP-server rules
//! 4. Legacy allow/deny arrays
//! 5. Blocked globs (read/write/edit)
//! 6. Command rules (bash/exec/execute)
//! 7. Default allow
//!
//! Observability: every terminal decision can be pushed through
//! `observability::record_decision`, which updates the low-cardinality
//! metrics registry, notifies an optionally-installed `PolicyObserver`, and
//! appends to the process-global audit sink.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod defaults;
pub mod evaluator;
pub mod glob;
pub mod model;
pub mod observability;
pub mod resolver;
pub mod store;

pub use evaluator::{evaluate, ToolInput};
pub use model::{
    ActionClass, ApprovalMode, CommandRule, Decision, HarnessConfig, McpServerRule, Permissions,
    PolicyDocument, Risk, RuleDecision, SandboxMode, ToolRule, Verdict,
};
pub use observability::{install_audit_sink, policy_metrics, record_decision, set_observer, PolicyObserver};
pub use resolver::{compute_strictest_baseline, resolve_policy};
pub use store::{FilePolicyStore, InMemoryPolicyStore, PolicyStore, StoreError};

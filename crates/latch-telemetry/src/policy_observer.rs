//! OTel-backed [`latch_policy::PolicyObserver`] that counts decisions by
//! action class and verdict.

#![allow(clippy::module_name_repetitions)]

use latch_policy::{ActionClass, Decision, PolicyObserver};
use once_cell::sync::OnceCell;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;

struct Instruments {
    counter: Counter<u64>,
}

static INSTR: OnceCell<Instruments> = OnceCell::new();

fn ensure_instruments() -> &'static Instruments {
    INSTR.get_or_init(|| {
        let meter: Meter = global::meter("latch.policy");
        let counter = meter
            .u64_counter("latch.policy.decision.count")
            .with_description("Policy decision counter, by action class and verdict")
            .init();
        Instruments { counter }
    })
}

fn action_class_str(action_class: ActionClass) -> &'static str {
    match action_class {
        ActionClass::Read => "read",
        ActionClass::Write => "write",
        ActionClass::Execute => "execute",
        ActionClass::Send => "send",
    }
}

/// Observer that records every decision as an OTel counter increment.
#[derive(Clone, Copy, Debug, Default)]
pub struct OtelPolicyObserver;

impl PolicyObserver for OtelPolicyObserver {
    fn on_decision(&self, tool_name: &str, action_class: ActionClass, decision: &Decision) {
        let inst = ensure_instruments();
        let verdict_str = match decision.verdict {
            latch_policy::Verdict::Allow => "allow",
            latch_policy::Verdict::Deny => "deny",
        };
        let attrs = [
            KeyValue::new("tool_name", tool_name.to_string()),
            KeyValue::new("action_class", action_class_str(action_class)),
            KeyValue::new("verdict", verdict_str),
            KeyValue::new("needs_prompt", decision.needs_prompt),
        ];
        inst.counter.add(1, &attrs);
    }
}

/// Return an observer instance. Cheap to construct; prefer a fresh value
/// over a `'static` reference.
#[must_use]
pub fn global() -> OtelPolicyObserver {
    let _ = ensure_instruments();
    OtelPolicyObserver
}

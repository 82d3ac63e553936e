//! Tool-name classification: maps a free-form tool name to an `ActionClass`.

use crate::model::ActionClass;
use once_cell::sync::Lazy;
use regex::Regex;

fn normalize(tool_name: &str) -> String {
    tool_name.to_lowercase().replace(['_', '-'], "")
}

/// Fixed lookup table, ported verbatim. Checked against the *normalized*
/// tool name (lowercase, `_`/`-` removed).
const FIXED_MAP: &[(&str, ActionClass)] = &[
    ("bash", ActionClass::Execute),
    ("exec", ActionClass::Execute),
    ("execute", ActionClass::Execute),
    ("task", ActionClass::Execute),
    ("write", ActionClass::Write),
    ("edit", ActionClass::Write),
    ("notebookedit", ActionClass::Write),
    ("read", ActionClass::Read),
    ("glob", ActionClass::Read),
    ("grep", ActionClass::Read),
    ("webfetch", ActionClass::Send),
    ("websearch", ActionClass::Send),
    ("browser", ActionClass::Send),
    ("enterplanmode", ActionClass::Read),
    ("exitplanmode", ActionClass::Read),
    ("skill", ActionClass::Read),
];

struct HeuristicRule {
    regex: Lazy<Regex>,
    class: ActionClass,
}

macro_rules! heuristic {
    ($pattern:expr, $class:expr) => {
        HeuristicRule { regex: Lazy::new(|| Regex::new($pattern).unwrap()), class: $class }
    };
}

static HEURISTICS: &[HeuristicRule] = &[
    heuristic!(r"\b(delete|remove|drop|destroy|kill|purge|reset|force)\b", ActionClass::Execute),
    heuristic!(
        r"\b(create|write|update|set|put|post|insert|modify|edit|patch|rename|move)\b",
        ActionClass::Write
    ),
    heuristic!(r"\b(send|email|notify|publish|push|deploy|upload)\b", ActionClass::Send),
    heuristic!(
        r"\b(read|get|list|search|find|query|fetch|show|describe|view|inspect|check|status|count|head|tail|cat|ls)\b",
        ActionClass::Read
    ),
];

/// Classify a tool name into an `ActionClass`. Falls back to `Execute`
/// (the conservative default) when nothing matches.
#[must_use]
pub fn classify(tool_name: &str) -> ActionClass {
    let normalized = normalize(tool_name);
    if let Some(tool_name_prefix) = normalized.strip_prefix("todo") {
        let _ = tool_name_prefix;
        return ActionClass::Read;
    }
    for (key, class) in FIXED_MAP {
        if normalized == *key {
            return *class;
        }
    }
    // `_`/`-` are word characters, so a `\b`-bounded heuristic token never
    // matches across one (e.g. "send_email" has no boundary between "d" and
    // "e"). Turn separators into spaces instead of stripping them, so each
    // snake_case/kebab-case segment keeps its own word boundary.
    let lowered = tool_name.to_lowercase().replace(['_', '-'], " ");
    for h in HEURISTICS {
        if h.regex.is_match(&lowered) {
            return h.class;
        }
    }
    ActionClass::Execute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_map_hits() {
        assert_eq!(classify("Bash"), ActionClass::Execute);
        assert_eq!(classify("Write"), ActionClass::Write);
        assert_eq!(classify("Read"), ActionClass::Read);
        assert_eq!(classify("WebFetch"), ActionClass::Send);
        assert_eq!(classify("TodoWrite"), ActionClass::Read);
    }

    #[test]
    fn heuristics_apply_in_order() {
        assert_eq!(classify("delete_record"), ActionClass::Execute);
        assert_eq!(classify("create_issue"), ActionClass::Write);
        assert_eq!(classify("send_email"), ActionClass::Send);
        assert_eq!(classify("list_items"), ActionClass::Read);
    }

    #[test]
    fn unknown_falls_back_to_execute() {
        assert_eq!(classify("mcp__custom__frobnicate"), ActionClass::Execute);
    }
}

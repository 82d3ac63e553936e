//! Built-in `CommandRule` defaults, used when a policy's `commandRules`
//! field is absent (as opposed to present-and-empty, which opts out).

use crate::model::{CommandRule, RuleDecision};

/// Return the built-in default command rules, in evaluation order.
#[must_use]
pub fn default_command_rules() -> Vec<CommandRule> {
    let rule = |pattern: &str, decision: RuleDecision, reason: &str| CommandRule {
        pattern: pattern.to_string(),
        decision,
        reason: Some(reason.to_string()),
    };
    vec![
        rule(r"rm\s+-[^\s]*r[^\s]*\s+/", RuleDecision::Deny, "Recursive delete of root paths"),
        rule(r"\b(mkfs|dd\s+of=/dev)", RuleDecision::Deny, "Disk formatting"),
        rule(
            r"\bcat\s+.*(\.env|id_rsa|\.pem|\.key)\b",
            RuleDecision::Deny,
            "Secret exfiltration",
        ),
        rule(r"(curl|wget)\s+.*\|\s*(sh|bash|zsh)", RuleDecision::Deny, "Pipe-to-shell"),
        rule(r"\b(shutdown|reboot|halt|poweroff)\b", RuleDecision::Deny, "System power"),
        rule(r"chmod\s+(777|\+s)\b", RuleDecision::Deny, "Broad permission change"),
        rule(r"\bsudo\b", RuleDecision::Prompt, "Privilege escalation"),
        rule(r"git\s+push\s+.*--force", RuleDecision::Prompt, "Destructive git"),
        rule(r"git\s+reset\s+--hard", RuleDecision::Prompt, "Destructive git"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deny_recursive_root_delete() {
        let rules = default_command_rules();
        assert_eq!(rules[0].pattern, r"rm\s+-[^\s]*r[^\s]*\s+/");
        assert_eq!(rules[0].decision, RuleDecision::Deny);
    }

    #[test]
    fn defaults_are_nonempty_and_ordered() {
        let rules = default_command_rules();
        assert_eq!(rules.len(), 9);
        assert_eq!(rules.last().unwrap().reason.as_deref(), Some("Destructive git"));
    }
}

//! Trigger rule model and loading.
//!
//! Rules come from the host's configuration as a flat table of
//! rule-name → options. Loading is tolerant: entries that are not tables
//! (e.g. the `keepassDb` path sitting next to the rules) or that lack the
//! required keys are skipped with a debug log, never an error.

use toml::Value;
use tracing::debug;

/// A single output trigger: when `pattern` matches the start of a pane's
/// last line, `action` is dispatched and its result typed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRule {
    /// Regex matched against a prefix of the last rendered line. Not
    /// validated at load time; a bad pattern surfaces when matching.
    pub pattern: String,
    /// Action line for the command dispatcher (`exec ...`, `input ...`, ...).
    pub action: String,
    /// Append a line terminator to the typed-back response.
    pub emit_newline: bool,
    /// Disabled rules stay loaded but never fire.
    pub enabled: bool,
}

/// Ordered set of trigger rules. Iteration order is load order; a rule
/// re-using an earlier rule's pattern overwrites it in place, keeping the
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<TriggerRule>,
}

impl RuleSet {
    /// Load rules from a configuration table of rule-name → options.
    ///
    /// An options table needs string keys `expect` and `action`; optional
    /// `new_line` defaults to `false` and `enabled` to `true`. Anything
    /// malformed is skipped.
    pub fn load(table: &toml::Table) -> Self {
        let mut set = RuleSet::default();
        for (name, value) in table {
            let Some(options) = value.as_table() else {
                debug!(rule = %name, "skipping non-table trigger entry");
                continue;
            };
            let pattern = options.get("expect").and_then(Value::as_str);
            let action = options.get("action").and_then(Value::as_str);
            let (Some(pattern), Some(action)) = (pattern, action) else {
                debug!(rule = %name, "skipping trigger without expect/action");
                continue;
            };
            set.insert(TriggerRule {
                pattern: pattern.to_string(),
                action: action.to_string(),
                emit_newline: options.get("new_line").and_then(Value::as_bool).unwrap_or(false),
                enabled: options.get("enabled").and_then(Value::as_bool).unwrap_or(true),
            });
            debug!(rule = %name, pattern = %pattern, "trigger loaded");
        }
        set
    }

    fn insert(&mut self, rule: TriggerRule) {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.pattern == rule.pattern) {
            *existing = rule;
        } else {
            self.rules.push(rule);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggerRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, pattern: &str) -> Option<&TriggerRule> {
        self.rules.iter().find(|r| r.pattern == pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(raw: &str) -> toml::Table {
        raw.parse().expect("valid toml")
    }

    #[test]
    fn loads_rule_with_defaults() {
        let set = RuleSet::load(&table(
            r#"
            [r1]
            expect = "^ping$"
            action = "input pong"
            "#,
        ));
        assert_eq!(set.len(), 1);
        let rule = set.get("^ping$").unwrap();
        assert_eq!(rule.action, "input pong");
        assert!(!rule.emit_newline);
        assert!(rule.enabled);
    }

    #[test]
    fn missing_expect_produces_no_rule() {
        let set = RuleSet::load(&table(
            r#"
            [bad]
            action = "input x"
            "#,
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn missing_action_produces_no_rule() {
        let set = RuleSet::load(&table(
            r#"
            [bad]
            expect = "^x"
            "#,
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn non_table_entries_are_ignored() {
        let set = RuleSet::load(&table(
            r#"
            keepassDb = "/home/user/secrets.kdbx"

            [r1]
            expect = "^login:"
            action = "input admin"
            new_line = true
            "#,
        ));
        assert_eq!(set.len(), 1);
        assert!(set.get("^login:").unwrap().emit_newline);
    }

    #[test]
    fn non_string_required_keys_are_treated_as_missing() {
        let set = RuleSet::load(&table(
            r#"
            [bad]
            expect = 42
            action = "input x"
            "#,
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_pattern_overwrites_in_place() {
        let set = RuleSet::load(&table(
            r#"
            [first]
            expect = "^a"
            action = "input one"

            [second]
            expect = "^b"
            action = "input two"

            [third]
            expect = "^a"
            action = "input three"
            "#,
        ));
        assert_eq!(set.len(), 2);
        let order: Vec<&str> = set.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(order, vec!["input three", "input two"]);
    }

    #[test]
    fn disabled_flag_is_loaded() {
        let set = RuleSet::load(&table(
            r#"
            [r1]
            expect = "^x"
            action = "input y"
            enabled = false
            "#,
        ));
        assert!(!set.get("^x").unwrap().enabled);
    }
}

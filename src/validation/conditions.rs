//! Conditional-requirement evaluation.
//!
//! Schema conditions are free-form text ("if available", "If the operation
//! ended in error"), so they are never interpreted. An evaluator decides per
//! condition whether a missing attribute should be reported.
//!
//! [`ConditionRules`] resolves a condition in this order:
//!
//! 1. an exact-text rule registered with [`ConditionRules::with_rule`]
//! 2. a skip phrase contained in the condition (case-insensitive)
//! 3. the fallback, which skips unless [`ConditionRules::enforce_unmatched`]
//!    was turned on
//!
//! The default instance enforces nothing.

use crate::domain::value::Attributes;
use std::collections::HashMap;

/// Whether a conditionally-required attribute must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Enforce,
    Skip,
}

/// Pluggable condition evaluator.
pub trait ConditionEvaluator: Send + Sync {
    /// Decides the outcome for `attribute` guarded by `condition`, given the
    /// entity's actual attributes.
    fn evaluate(&self, attribute: &str, condition: &str, attributes: &Attributes) -> ConditionOutcome;
}

type Predicate = Box<dyn Fn(&Attributes) -> bool + Send + Sync>;

/// Rule-based evaluator keyed by condition text.
#[derive(Default)]
pub struct ConditionRules {
    rules: HashMap<String, Predicate>,
    skip_phrases: Vec<String>,
    enforce_unmatched: bool,
}

impl ConditionRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predicate for one exact condition string. The attribute
    /// is enforced when the predicate returns true.
    #[must_use]
    pub fn with_rule<F>(mut self, condition: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Attributes) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(condition.into(), Box::new(predicate));
        self
    }

    /// Conditions containing any of these phrases are always skipped.
    #[must_use]
    pub fn with_skip_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_phrases.extend(phrases.into_iter().map(|p| p.into().to_lowercase()));
        self
    }

    /// Enforces conditions that match neither a rule nor a skip phrase.
    #[must_use]
    pub const fn enforce_unmatched(mut self, enforce: bool) -> Self {
        self.enforce_unmatched = enforce;
        self
    }
}

impl ConditionEvaluator for ConditionRules {
    fn evaluate(&self, attribute: &str, condition: &str, attributes: &Attributes) -> ConditionOutcome {
        if let Some(predicate) = self.rules.get(condition) {
            return if predicate(attributes) { ConditionOutcome::Enforce } else { ConditionOutcome::Skip };
        }

        let lowered = condition.to_lowercase();
        if self.skip_phrases.iter().any(|phrase| lowered.contains(phrase.as_str())) {
            tracing::trace!(attribute, condition, "condition skipped by phrase");
            return ConditionOutcome::Skip;
        }

        if self.enforce_unmatched {
            ConditionOutcome::Enforce
        } else {
            ConditionOutcome::Skip
        }
    }
}

impl std::fmt::Debug for ConditionRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut conditions: Vec<&String> = self.rules.keys().collect();
        conditions.sort();
        f.debug_struct("ConditionRules")
            .field("rules", &conditions)
            .field("skip_phrases", &self.skip_phrases)
            .field("enforce_unmatched", &self.enforce_unmatched)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERROR_CONDITION: &str = "If the operation ended in an error";

    #[test]
    fn default_enforces_nothing() {
        let rules = ConditionRules::new();
        assert_eq!(rules.evaluate("error.type", ERROR_CONDITION, &Attributes::new()), ConditionOutcome::Skip);
    }

    #[test]
    fn phrase_policy_skips_ambient_conditions_and_enforces_the_rest() {
        let rules = ConditionRules::new().with_skip_phrases(["if available"]).enforce_unmatched(true);
        assert_eq!(
            rules.evaluate("gen_ai.request.model", "If Available", &Attributes::new()),
            ConditionOutcome::Skip
        );
        assert_eq!(rules.evaluate("error.type", ERROR_CONDITION, &Attributes::new()), ConditionOutcome::Enforce);
    }

    #[test]
    fn keyed_rule_wins_over_phrases() {
        let rules = ConditionRules::new()
            .with_skip_phrases(["error"])
            .with_rule(ERROR_CONDITION, |attrs| attrs.contains_key("exception.type"));

        let mut attrs = Attributes::new();
        assert_eq!(rules.evaluate("error.type", ERROR_CONDITION, &attrs), ConditionOutcome::Skip);
        attrs.insert("exception.type".into(), "TimeoutError".into());
        assert_eq!(rules.evaluate("error.type", ERROR_CONDITION, &attrs), ConditionOutcome::Enforce);
    }
}

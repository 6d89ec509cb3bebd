//! Accumulated validation findings.
//!
//! These are not `Result` errors: validators collect them into lists and
//! reports, and the caller decides severity. [`ErrorKind`] lets reporting
//! tell "no schema" apart from "schema violated" without matching on
//! payloads.

use crate::schema::model::EntityKind;
use thiserror::Error;

/// Classifier for [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SchemaNotFound,
    MissingRequiredAttribute,
    MissingConditionalAttribute,
    MissingAttribute,
    AttributeValueMismatch,
    ValueCheckFailed,
    EventNameMismatch,
    EventCountShortfall,
    EventAttribute,
    SpanNotFound,
    StatusMismatch,
    ExceptionMismatch,
    MetricNameMismatch,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("schema not found: {kind} schema '{schema_id}'")]
    SchemaNotFound { kind: EntityKind, schema_id: String },

    #[error("missing required attribute: {0}")]
    MissingRequiredAttribute(String),

    #[error("missing conditionally required attribute: {attribute} ({condition})")]
    MissingConditionalAttribute { attribute: String, condition: String },

    /// An expected attribute is absent from the actual entity.
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    #[error("attribute '{key}' value mismatch: expected '{expected}', got '{actual}'")]
    AttributeValueMismatch { key: String, expected: String, actual: String },

    #[error("attribute '{attribute}' failed value check: {message}")]
    ValueCheckFailed { attribute: String, message: String },

    /// `position` is set for ordered-event checks and absent for schema
    /// event-name checks.
    #[error("event name mismatch{}: expected '{expected}' got '{actual}'", at_position(.position))]
    EventNameMismatch { position: Option<usize>, expected: String, actual: String },

    #[error("expected at least {expected} events, got {actual}")]
    EventCountShortfall { expected: usize, actual: usize },

    /// A finding inside the payload of the event at `position`.
    #[error("event {position} '{event}': {finding}")]
    EventAttribute { position: usize, event: String, finding: Box<ValidationError> },

    /// `skipped` lists the expected descendants that were not checked.
    #[error("span '{name}' not found{}{}", under_parent(.parent), skipped_children(.skipped))]
    SpanNotFound { name: String, parent: Option<String>, skipped: Vec<String> },

    #[error("status mismatch: expected {expected}, got {actual}")]
    StatusMismatch { expected: String, actual: String },

    #[error("exception mismatch: expected {expected}, {actual}")]
    ExceptionMismatch { expected: String, actual: String },

    #[error("metric name mismatch: expected '{expected}' got '{actual}'")]
    MetricNameMismatch { expected: String, actual: String },
}

fn at_position(position: &Option<usize>) -> String {
    position.map(|p| format!(" at position {p}")).unwrap_or_default()
}

fn under_parent(parent: &Option<String>) -> String {
    parent.as_ref().map(|p| format!(" under '{p}'")).unwrap_or_default()
}

fn skipped_children(skipped: &[String]) -> String {
    if skipped.is_empty() {
        String::new()
    } else {
        format!(" (skipped expected children: {})", skipped.join(", "))
    }
}

impl ValidationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaNotFound { .. } => ErrorKind::SchemaNotFound,
            Self::MissingRequiredAttribute(_) => ErrorKind::MissingRequiredAttribute,
            Self::MissingConditionalAttribute { .. } => ErrorKind::MissingConditionalAttribute,
            Self::MissingAttribute(_) => ErrorKind::MissingAttribute,
            Self::AttributeValueMismatch { .. } => ErrorKind::AttributeValueMismatch,
            Self::ValueCheckFailed { .. } => ErrorKind::ValueCheckFailed,
            Self::EventNameMismatch { .. } => ErrorKind::EventNameMismatch,
            Self::EventCountShortfall { .. } => ErrorKind::EventCountShortfall,
            Self::EventAttribute { .. } => ErrorKind::EventAttribute,
            Self::SpanNotFound { .. } => ErrorKind::SpanNotFound,
            Self::StatusMismatch { .. } => ErrorKind::StatusMismatch,
            Self::ExceptionMismatch { .. } => ErrorKind::ExceptionMismatch,
            Self::MetricNameMismatch { .. } => ErrorKind::MetricNameMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_diagnostics() {
        let mismatch = ValidationError::EventNameMismatch {
            position: Some(0),
            expected: "A".into(),
            actual: "B".into(),
        };
        assert_eq!(mismatch.to_string(), "event name mismatch at position 0: expected 'A' got 'B'");

        let missing = ValidationError::SpanNotFound {
            name: "execute_tool get_weather".into(),
            parent: Some("chat gpt-4o".into()),
            skipped: vec![],
        };
        assert_eq!(missing.to_string(), "span 'execute_tool get_weather' not found under 'chat gpt-4o'");
        assert_eq!(missing.kind(), ErrorKind::SpanNotFound);
    }
}

//! Declarative expected span trees.
//!
//! A [`Scenario`] is parsed once and stays immutable for the whole run.
//! Expected attributes are a subset match: every listed key must be present
//! with an equal (string-normalized) value, extra actual keys are fine.

use crate::domain::value::Attributes;
use crate::telemetry::snapshot::SpanStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete scenario: metadata plus one or more expected root spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    /// `configuration.service_name`, when the file sets one.
    pub service_name: Option<String>,
    pub roots: Vec<ScenarioNode>,
    /// `schema_validation.span_schemas`: schema ids enforced on every root.
    pub span_schemas: Vec<String>,
}

impl Scenario {
    /// Total number of span definitions, children included.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.roots.iter().map(ScenarioNode::subtree_len).sum()
    }
}

/// One expected span and its expected children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioNode {
    pub name: String,
    #[serde(default)]
    pub expected_attributes: Attributes,
    #[serde(default)]
    pub expected_events: Vec<ExpectedEvent>,
    #[serde(default)]
    pub expected_status: Option<ExpectedStatus>,
    #[serde(default)]
    pub expected_exception: Option<ExpectedException>,
    /// Schema id to validate the matched span against.
    #[serde(default, alias = "schema")]
    pub schema_id: Option<String>,
    #[serde(default, rename = "child_spans")]
    pub children: Vec<ScenarioNode>,
}

impl ScenarioNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_attributes: Attributes::new(),
            expected_events: Vec::new(),
            expected_status: None,
            expected_exception: None,
            schema_id: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.expected_attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: ExpectedEvent) -> Self {
        self.expected_events.push(event);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }

    /// Names of every descendant, depth-first.
    #[must_use]
    pub fn descendant_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for child in &self.children {
            names.push(child.name.clone());
            names.extend(child.descendant_names());
        }
        names
    }

    fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// An expected span event. Attributes are a subset match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedEvent {
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// Event schema id the actual event's payload is validated against.
    #[serde(default, alias = "schema")]
    pub schema_id: Option<String>,
}

impl ExpectedEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self { name: name.into(), attributes, schema_id: None }
    }

    #[must_use]
    pub fn with_schema(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }
}

/// Status code as written in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    Unset,
    Ok,
    Error,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        })
    }
}

/// Expected final status. The description is only compared when given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedStatus {
    pub status_code: StatusCode,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExpectedStatus {
    /// The concrete status a producer should set to satisfy this
    /// expectation.
    #[must_use]
    pub fn to_status(&self) -> SpanStatus {
        match self.status_code {
            StatusCode::Unset => SpanStatus::Unset,
            StatusCode::Ok => SpanStatus::Ok,
            StatusCode::Error => SpanStatus::Error(self.description.clone().unwrap_or_default()),
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({description})", self.status_code),
            None => write!(f, "{}", self.status_code),
        }
    }
}

/// Expected recorded exception. Unset fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpectedException {
    #[serde(default, rename = "type")]
    pub exception_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for ExpectedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.exception_type.as_deref().unwrap_or("*"),
            self.message.as_deref().unwrap_or("*")
        )
    }
}

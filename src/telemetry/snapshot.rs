//! Read-only snapshot of captured telemetry.
//!
//! A capture is a forest of [`SpanNode`]s linked by `parent_id`. Multiple
//! roots are legal. Event order within a span is preserved exactly as
//! recorded.

use crate::domain::value::Attributes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Name of the span event that carries a recorded exception.
pub const EXCEPTION_EVENT_NAME: &str = "exception";

/// Final status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error(String),
}

impl SpanStatus {
    /// Upper-case status code as written in scenario files.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error(_) => "ERROR",
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Error(description) => Some(description),
            _ => None,
        }
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(description) if !description.is_empty() => write!(f, "ERROR ({description})"),
            other => f.write_str(other.code()),
        }
    }
}

/// A named, timestamped occurrence within a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub time_unix_nano: u64,
}

impl SpanEvent {
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: Attributes) -> Self {
        Self { name: name.into(), attributes, time_unix_nano: 0 }
    }
}

/// An exception recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub exception_type: String,
    pub message: String,
    /// Extra attributes recorded alongside the exception (e.g. `error.type`).
    #[serde(default)]
    pub attributes: Attributes,
}

impl ExceptionRecord {
    /// Extracts an exception record from an `exception` span event.
    ///
    /// Returns `None` for events with any other name.
    #[must_use]
    pub fn from_event(event: &SpanEvent) -> Option<Self> {
        if event.name != EXCEPTION_EVENT_NAME {
            return None;
        }
        let mut attributes = event.attributes.clone();
        let exception_type = attributes
            .remove("exception.type")
            .map(|v| v.normalized())
            .unwrap_or_default();
        let message = attributes
            .remove("exception.message")
            .map(|v| v.normalized())
            .unwrap_or_default();
        Some(Self { exception_type, message, attributes })
    }

    /// Converts back into the `exception` span event representation.
    #[must_use]
    pub fn to_event(&self) -> SpanEvent {
        let mut attributes = self.attributes.clone();
        attributes.insert("exception.type".into(), self.exception_type.clone().into());
        attributes.insert("exception.message".into(), self.message.clone().into());
        SpanEvent::new(EXCEPTION_EVENT_NAME, attributes)
    }
}

/// One finished span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanNode {
    pub name: String,
    pub trace_id: String,
    pub span_id: String,
    /// `None` marks a root.
    pub parent_id: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Ordered events as recorded, `exception` events included.
    #[serde(default)]
    pub events: Vec<SpanEvent>,
    #[serde(default)]
    pub status: SpanStatus,
    /// Exceptions decoded from the `exception` events, in order.
    #[serde(default)]
    pub exceptions: Vec<ExceptionRecord>,
    #[serde(default)]
    pub start_time_unix_nano: u64,
    #[serde(default)]
    pub end_time_unix_nano: u64,
}

impl SpanNode {
    /// Creates a span with no attributes, events or parent.
    #[must_use]
    pub fn new(name: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trace_id: String::new(),
            span_id: span_id.into(),
            parent_id: None,
            attributes: Attributes::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
            exceptions: Vec::new(),
            start_time_unix_nano: 0,
            end_time_unix_nano: 0,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Appends an event. An `exception` event is also added to
    /// [`SpanNode::exceptions`].
    #[must_use]
    pub fn with_event(mut self, event: SpanEvent) -> Self {
        self.exceptions.extend(ExceptionRecord::from_event(&event));
        self.events.push(event);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Rebuilds [`SpanNode::exceptions`] from the `exception` events.
    /// The ordered event list is left as recorded.
    pub(crate) fn collect_exceptions(&mut self) {
        self.exceptions = self.events.iter().filter_map(ExceptionRecord::from_event).collect();
    }
}

/// A metric data point as seen by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// An immutable forest of captured spans, in capture order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanForest {
    spans: Vec<SpanNode>,
}

impl SpanForest {
    #[must_use]
    pub fn new(spans: Vec<SpanNode>) -> Self {
        Self { spans }
    }

    #[must_use]
    pub fn spans(&self) -> &[SpanNode] {
        &self.spans
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &SpanNode> {
        self.spans.iter().filter(|s| s.is_root())
    }

    /// Spans whose parent is `span_id`, in capture order.
    pub fn children_of<'s, 'p>(&'s self, span_id: &'p str) -> impl Iterator<Item = &'s SpanNode> + 'p
    where
        's: 'p,
    {
        self.spans.iter().filter(move |s| s.parent_id.as_deref() == Some(span_id))
    }

    /// First span with the given name, in capture order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&SpanNode> {
        self.spans.iter().find(|s| s.name == name)
    }

    /// First child of `parent_id` with the given name.
    #[must_use]
    pub fn find_child(&self, parent_id: &str, name: &str) -> Option<&SpanNode> {
        self.spans
            .iter()
            .find(|s| s.parent_id.as_deref() == Some(parent_id) && s.name == name)
    }

    /// Spans whose `parent_id` does not resolve within this capture.
    #[must_use]
    pub fn orphans(&self) -> Vec<&SpanNode> {
        let ids: HashSet<&str> = self.spans.iter().map(|s| s.span_id.as_str()).collect();
        self.spans
            .iter()
            .filter(|s| s.parent_id.as_deref().is_some_and(|p| !ids.contains(p)))
            .collect()
    }
}

impl From<Vec<SpanNode>> for SpanForest {
    fn from(spans: Vec<SpanNode>) -> Self {
        Self::new(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_and_orphans() {
        let forest = SpanForest::new(vec![
            SpanNode::new("execute_tool get_weather", "b").with_parent("a"),
            SpanNode::new("chat gpt-4o", "a"),
            SpanNode::new("stray", "c").with_parent("missing"),
        ]);

        assert_eq!(forest.roots().count(), 1);
        assert_eq!(forest.find_child("a", "execute_tool get_weather").map(|s| s.span_id.as_str()), Some("b"));
        assert!(forest.find_child("c", "execute_tool get_weather").is_none());
        assert_eq!(forest.orphans().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["stray"]);
    }

    #[test]
    fn found_child_outlives_the_parent_id_buffer() {
        let forest = SpanForest::new(vec![
            SpanNode::new("chat gpt-4o", "a"),
            SpanNode::new("execute_tool get_weather", "b").with_parent("a"),
        ]);

        let child = {
            let parent_id = String::from("a");
            forest.find_child(&parent_id, "execute_tool get_weather")
        };
        assert_eq!(child.map(|s| s.span_id.as_str()), Some("b"));
        assert_eq!(forest.children_of("a").count(), 1);
    }

    #[test]
    fn exception_events_stay_in_order_and_are_also_collected() {
        let mut attrs = Attributes::new();
        attrs.insert("exception.type".into(), "RateLimitError".into());
        attrs.insert("exception.message".into(), "try again later".into());
        attrs.insert("error.type".into(), "rate_limit_exceeded".into());

        let mut span = SpanNode::new("execute_tool news_api_lookup", "a")
            .with_event(SpanEvent::new("before", Attributes::new()))
            .with_event(SpanEvent::new(EXCEPTION_EVENT_NAME, attrs))
            .with_event(SpanEvent::new("after", Attributes::new()));
        assert_eq!(
            span.events.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["before", EXCEPTION_EVENT_NAME, "after"]
        );
        assert_eq!(span.exceptions.len(), 1);

        span.collect_exceptions();
        assert_eq!(span.exceptions.len(), 1);
        assert_eq!(span.exceptions[0].exception_type, "RateLimitError");
        assert_eq!(span.exceptions[0].attributes.len(), 1);
        assert_eq!(ExceptionRecord::from_event(&span.exceptions[0].to_event()).as_ref(), Some(&span.exceptions[0]));
    }
}

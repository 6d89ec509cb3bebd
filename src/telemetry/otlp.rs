//! OTLP/JSON encoding and decoding of captured spans.
//!
//! The encoded form is the standard OTLP JSON trace document, one per
//! exported batch:
//!
//! ```json
//! {
//!   "resourceSpans": [{
//!     "resource": {
//!       "attributes": [{"key": "service.name", "value": {"stringValue": "agent-service"}}]
//!     },
//!     "scopeSpans": [{
//!       "scope": {"name": "genai-otel-validator"},
//!       "spans": [...]
//!     }]
//!   }]
//! }
//! ```
//!
//! Trace files are sequences of such documents (usually one per line), which
//! is what the rotating file exporter writes and what the `check` command
//! reads back.

use super::snapshot::{SpanEvent, SpanForest, SpanNode, SpanStatus};
use crate::domain::value::{AttributeValue, Attributes};
use crate::domain::{Result, ValidatorError};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;

/// Instrumentation scope name written into every document.
pub const SCOPE_NAME: &str = "genai-otel-validator";

/// Encodes a batch of spans as one OTLP JSON document.
///
/// Events are written in recorded order, `exception` events included.
#[must_use]
pub fn encode_document(resource: &Attributes, spans: &[SpanNode]) -> JsonValue {
    let spans_json: Vec<JsonValue> = spans.iter().map(encode_span).collect();

    serde_json::json!({
        "resourceSpans": [{
            "resource": {
                "attributes": encode_attributes(resource)
            },
            "scopeSpans": [{
                "scope": {
                    "name": SCOPE_NAME,
                },
                "spans": spans_json
            }]
        }]
    })
}

fn encode_span(span: &SpanNode) -> JsonValue {
    let events: Vec<JsonValue> = span
        .events
        .iter()
        .map(|event| {
            serde_json::json!({
                "timeUnixNano": event.time_unix_nano.to_string(),
                "name": event.name,
                "attributes": encode_attributes(&event.attributes),
            })
        })
        .collect();

    let status_code = match span.status {
        SpanStatus::Unset => 0,
        SpanStatus::Ok => 1,
        SpanStatus::Error(_) => 2,
    };

    serde_json::json!({
        "traceId": span.trace_id,
        "spanId": span.span_id,
        "parentSpanId": span.parent_id.clone().unwrap_or_default(),
        "name": span.name,
        "kind": 1,
        "startTimeUnixNano": span.start_time_unix_nano.to_string(),
        "endTimeUnixNano": span.end_time_unix_nano.to_string(),
        "attributes": encode_attributes(&span.attributes),
        "events": events,
        "status": {
            "code": status_code,
            "message": span.status.description().unwrap_or_default(),
        },
    })
}

fn encode_attributes(attributes: &Attributes) -> Vec<JsonValue> {
    attributes
        .iter()
        .map(|(key, value)| {
            serde_json::json!({
                "key": key,
                "value": encode_value(value)
            })
        })
        .collect()
}

/// Maps attribute values to OTLP `AnyValue`. Integers are strings, as the
/// OTLP JSON mapping requires for 64-bit values.
fn encode_value(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Bool(b) => serde_json::json!({ "boolValue": b }),
        AttributeValue::Int(i) => serde_json::json!({ "intValue": i.to_string() }),
        AttributeValue::Double(f) => serde_json::json!({ "doubleValue": f }),
        AttributeValue::String(s) => serde_json::json!({ "stringValue": s }),
        AttributeValue::Array(items) => {
            let values: Vec<JsonValue> = items.iter().map(encode_value).collect();
            serde_json::json!({ "arrayValue": { "values": values } })
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpDocument {
    #[serde(default)]
    resource_spans: Vec<OtlpResourceSpans>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpResourceSpans {
    #[serde(default)]
    scope_spans: Vec<OtlpScopeSpans>,
}

#[derive(Debug, Deserialize)]
struct OtlpScopeSpans {
    #[serde(default)]
    spans: Vec<OtlpSpan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpSpan {
    #[serde(default)]
    trace_id: String,
    span_id: String,
    #[serde(default)]
    parent_span_id: String,
    name: String,
    #[serde(default)]
    start_time_unix_nano: JsonValue,
    #[serde(default)]
    end_time_unix_nano: JsonValue,
    #[serde(default)]
    attributes: Vec<OtlpKeyValue>,
    #[serde(default)]
    events: Vec<OtlpEvent>,
    #[serde(default)]
    status: Option<OtlpStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpEvent {
    name: String,
    #[serde(default)]
    time_unix_nano: JsonValue,
    #[serde(default)]
    attributes: Vec<OtlpKeyValue>,
}

#[derive(Debug, Deserialize)]
struct OtlpStatus {
    #[serde(default)]
    code: JsonValue,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OtlpKeyValue {
    key: String,
    value: OtlpAnyValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtlpAnyValue {
    string_value: Option<String>,
    bool_value: Option<bool>,
    int_value: Option<JsonValue>,
    double_value: Option<f64>,
    array_value: Option<OtlpArrayValue>,
}

#[derive(Debug, Default, Deserialize)]
struct OtlpArrayValue {
    #[serde(default)]
    values: Vec<OtlpAnyValue>,
}

impl OtlpAnyValue {
    fn into_value(self) -> AttributeValue {
        if let Some(s) = self.string_value {
            return AttributeValue::String(s);
        }
        if let Some(b) = self.bool_value {
            return AttributeValue::Bool(b);
        }
        if let Some(i) = self.int_value {
            return match &i {
                JsonValue::Number(n) => n.as_i64().map_or_else(|| AttributeValue::String(n.to_string()), AttributeValue::Int),
                JsonValue::String(s) => s.parse().map_or_else(|_| AttributeValue::String(s.clone()), AttributeValue::Int),
                other => AttributeValue::String(other.to_string()),
            };
        }
        if let Some(f) = self.double_value {
            return AttributeValue::Double(f);
        }
        if let Some(array) = self.array_value {
            return AttributeValue::Array(array.values.into_iter().map(Self::into_value).collect());
        }
        AttributeValue::String(String::new())
    }
}

fn decode_attributes(attributes: Vec<OtlpKeyValue>) -> Attributes {
    attributes.into_iter().map(|kv| (kv.key, kv.value.into_value())).collect()
}

/// Reads an OTLP nanosecond timestamp, which may be a number or a decimal
/// string.
fn nanos(value: &JsonValue) -> u64 {
    match value {
        JsonValue::Number(n) => n.as_u64().unwrap_or_default(),
        JsonValue::String(s) => s.parse().unwrap_or_default(),
        _ => 0,
    }
}

fn decode_status(status: Option<OtlpStatus>) -> SpanStatus {
    let Some(status) = status else {
        return SpanStatus::Unset;
    };
    let code = match &status.code {
        JsonValue::Number(n) => n.as_u64().unwrap_or_default(),
        JsonValue::String(s) if s.ends_with("ERROR") => 2,
        JsonValue::String(s) if s.ends_with("OK") => 1,
        _ => 0,
    };
    match code {
        1 => SpanStatus::Ok,
        2 => SpanStatus::Error(status.message),
        _ => SpanStatus::Unset,
    }
}

impl OtlpSpan {
    fn into_node(self) -> SpanNode {
        let mut node = SpanNode {
            name: self.name,
            trace_id: self.trace_id,
            span_id: self.span_id,
            parent_id: Some(self.parent_span_id).filter(|p| !p.is_empty()),
            attributes: decode_attributes(self.attributes),
            events: self
                .events
                .into_iter()
                .map(|event| SpanEvent {
                    name: event.name,
                    time_unix_nano: nanos(&event.time_unix_nano),
                    attributes: decode_attributes(event.attributes),
                })
                .collect(),
            status: decode_status(self.status),
            exceptions: Vec::new(),
            start_time_unix_nano: nanos(&self.start_time_unix_nano),
            end_time_unix_nano: nanos(&self.end_time_unix_nano),
        };
        node.collect_exceptions();
        node
    }
}

/// Decodes every span in a sequence of OTLP JSON documents.
///
/// Documents may be separated by newlines or simply concatenated; a single
/// pretty-printed document also works.
///
/// # Errors
///
/// Returns [`ValidatorError::TraceFile`] if any document is malformed.
pub fn decode_documents(text: &str) -> Result<Vec<SpanNode>> {
    let mut spans = Vec::new();
    for document in serde_json::Deserializer::from_str(text).into_iter::<OtlpDocument>() {
        let document = document.map_err(|e| ValidatorError::TraceFile(e.to_string()))?;
        for resource in document.resource_spans {
            for scope in resource.scope_spans {
                spans.extend(scope.spans.into_iter().map(OtlpSpan::into_node));
            }
        }
    }
    Ok(spans)
}

/// Loads a trace file written by the file exporter into a span forest.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`ValidatorError::TraceFile`] if it is not OTLP JSON.
pub fn read_trace_file(path: &Path) -> Result<SpanForest> {
    let text = std::fs::read_to_string(path)?;
    let spans = decode_documents(&text)?;
    tracing::debug!(path = %path.display(), spans = spans.len(), "read trace file");
    Ok(SpanForest::new(spans))
}

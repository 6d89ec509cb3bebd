//! Scenario parsing from YAML.
//!
//! ```yaml
//! name: Tool usage
//! description: Agent calls a weather tool
//! configuration:
//!   service_name: agent-with-tools
//! spans:
//!   - name: chat gpt-4o
//!     expected_attributes:
//!       gen_ai.system: openai
//!     expected_events:
//!       - name: gen_ai.user.message
//!     child_spans:
//!       - name: execute_tool get_weather
//! schema_validation:
//!   span_schemas: [span.gen_ai.client]
//! ```

use super::model::{Scenario, ScenarioNode};
use crate::domain::error::ScenarioError;
use serde::Deserialize;
use std::path::Path;

/// Top-level keys that must always be present.
const REQUIRED_KEYS: [&str; 3] = ["name", "description", "spans"];

#[derive(Debug, Deserialize)]
struct RawScenario {
    name: String,
    description: String,
    #[serde(default)]
    configuration: RawConfiguration,
    spans: Vec<ScenarioNode>,
    #[serde(default)]
    schema_validation: RawSchemaValidation,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfiguration {
    #[serde(default)]
    service_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSchemaValidation {
    #[serde(default)]
    span_schemas: Vec<String>,
}

/// Parses a scenario document.
///
/// # Errors
///
/// - [`ScenarioError::MissingField`] when `name`, `description` or `spans`
///   is absent
/// - [`ScenarioError::ParseError`] when the text is not valid YAML or a
///   field has the wrong shape
///
/// # Examples
///
/// ```
/// use genai_otel_validator::scenario::parse;
///
/// let scenario = parse(
///     r#"
/// name: Chat
/// description: One chat span
/// spans:
///   - name: chat gpt-4o
///     expected_attributes:
///       gen_ai.usage.input_tokens: 150
/// schema_validation:
///   span_schemas: [span.gen_ai.client]
/// "#,
/// )?;
/// assert_eq!(scenario.roots[0].expected_attributes["gen_ai.usage.input_tokens"].normalized(), "150");
/// assert_eq!(scenario.span_schemas, vec!["span.gen_ai.client"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse(source: &str) -> Result<Scenario, ScenarioError> {
    let document: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(source).map_err(|e| ScenarioError::ParseError(e.to_string()))?;

    let Some(mapping) = document.as_mapping() else {
        return Err(ScenarioError::ParseError("scenario must be a mapping".to_string()));
    };
    if let Some(missing) = REQUIRED_KEYS.into_iter().find(|key| !mapping.contains_key(*key)) {
        return Err(ScenarioError::MissingField(missing));
    }

    let raw: RawScenario =
        serde_yaml_ng::from_value(document).map_err(|e| ScenarioError::ParseError(e.to_string()))?;

    let scenario = Scenario {
        name: raw.name,
        description: raw.description,
        service_name: raw.configuration.service_name,
        roots: raw.spans,
        span_schemas: raw.schema_validation.span_schemas,
    };
    tracing::debug!(scenario = %scenario.name, spans = scenario.span_count(), "parsed scenario");
    Ok(scenario)
}

/// Reads and parses a scenario file.
///
/// # Errors
///
/// [`ScenarioError::Io`] if the file cannot be read, otherwise as
/// [`parse`].
pub fn load(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::AttributeValue;
    use crate::scenario::model::StatusCode;

    const TOOL: &str = r#"
name: Tool usage
description: Agent calls a tool
configuration:
  service_name: agent-with-tools
spans:
  - name: chat gpt-4o
    schema: span.gen_ai.client
    expected_attributes:
      gen_ai.system: openai
      gen_ai.usage.input_tokens: 150
    expected_events:
      - name: gen_ai.user.message
        attributes:
          content: "What's the weather in Paris?"
    child_spans:
      - name: execute_tool get_weather
        expected_status:
          status_code: ERROR
          description: timeout
        expected_exception:
          type: TimeoutError
schema_validation:
  span_schemas:
    - span.gen_ai.client
"#;

    #[test]
    fn parses_nested_definitions() {
        let scenario = parse(TOOL).unwrap();
        assert_eq!(scenario.service_name.as_deref(), Some("agent-with-tools"));
        assert_eq!(scenario.span_schemas, vec!["span.gen_ai.client"]);
        assert_eq!(scenario.span_count(), 2);

        let root = &scenario.roots[0];
        assert_eq!(root.schema_id.as_deref(), Some("span.gen_ai.client"));
        assert_eq!(root.expected_attributes["gen_ai.usage.input_tokens"], AttributeValue::Int(150));
        assert_eq!(root.expected_events[0].name, "gen_ai.user.message");

        let child = &root.children[0];
        let status = child.expected_status.as_ref().unwrap();
        assert_eq!(status.status_code, StatusCode::Error);
        assert_eq!(status.description.as_deref(), Some("timeout"));
        assert_eq!(child.expected_exception.as_ref().unwrap().exception_type.as_deref(), Some("TimeoutError"));
    }

    #[test]
    fn each_required_key_is_reported() {
        for key in REQUIRED_KEYS {
            let text: String = TOOL
                .lines()
                .filter(|line| !line.starts_with(&format!("{key}:")))
                .collect::<Vec<_>>()
                .join("\n");
            let text = if key == "spans" {
                "name: x\ndescription: y\n".to_string()
            } else {
                text
            };
            match parse(&text) {
                Err(ScenarioError::MissingField(field)) => assert_eq!(field, key),
                other => panic!("expected MissingField({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(parse("name: [unclosed"), Err(ScenarioError::ParseError(_))));
        assert!(matches!(parse("- just\n- a list"), Err(ScenarioError::ParseError(_))));
        assert!(matches!(
            parse("name: x\ndescription: y\nspans: not-a-list"),
            Err(ScenarioError::ParseError(_))
        ));
    }
}

//! Scenario-tree matching.
//!
//! # Algorithm
//!
//! For each expected root, the first captured span with the same name (in
//! capture order, anywhere in the forest) is matched. For each expected
//! child, the first captured span with the same name whose `parent_id` is
//! the matched parent's `span_id` is matched. A span that cannot be matched
//! yields one `SpanNotFound` record listing its skipped descendants; those
//! descendants get no records of their own.
//!
//! Each matched span is checked for attributes, ordered events, status,
//! exception and, when a schema validator is configured, its bound span
//! schemas and the event schemas bound to its expected events.
//! Scenario-level `span_schemas` apply to root definitions only.

use super::entity::SchemaValidator;
use super::error::ValidationError;
use super::matching::{validate_attribute_equality, validate_events_in_order, validate_exception, validate_status};
use super::report::{SpanRecord, ValidationReport};
use crate::schema::model::EntityKind;
use crate::scenario::model::{Scenario, ScenarioNode};
use crate::telemetry::snapshot::{SpanForest, SpanNode};

const PATH_SEPARATOR: &str = " > ";

/// Validates captured forests against scenarios.
///
/// Schema checks are optional: without a [`SchemaValidator`], `schema_id`
/// bindings are ignored.
#[derive(Debug, Default)]
pub struct TreeValidator {
    schema: Option<SchemaValidator>,
}

impl TreeValidator {
    /// Creates a validator that checks expectations only.
    #[must_use]
    pub const fn new() -> Self {
        Self { schema: None }
    }

    /// Creates a validator that also enforces schema bindings.
    #[must_use]
    pub const fn with_schema(schema: SchemaValidator) -> Self {
        Self { schema: Some(schema) }
    }

    #[must_use]
    pub const fn schema(&self) -> Option<&SchemaValidator> {
        self.schema.as_ref()
    }

    /// Matches `scenario` against `forest` and reports one record per span
    /// definition reached.
    ///
    /// # Parameters
    ///
    /// * `scenario` - The expected span tree
    /// * `forest` - Everything captured for the run
    ///
    /// # Returns
    ///
    /// A report with records in depth-first definition order, each keyed by
    /// its `parent > child` path. A span that cannot be found gets a single
    /// `SpanNotFound` record and its descendants get none.
    ///
    /// # Examples
    ///
    /// ```
    /// use genai_otel_validator::scenario::parse;
    /// use genai_otel_validator::telemetry::{SpanForest, SpanNode};
    /// use genai_otel_validator::validation::TreeValidator;
    ///
    /// let scenario = parse(
    ///     "name: Tool\ndescription: chat with a tool\nspans:\n  - name: chat\n    child_spans:\n      - name: execute_tool\n",
    /// )?;
    /// let forest = SpanForest::new(vec![
    ///     SpanNode::new("chat", "00000000000000a1"),
    ///     SpanNode::new("execute_tool", "00000000000000b2").with_parent("00000000000000a1"),
    /// ]);
    ///
    /// let report = TreeValidator::new().validate_scenario(&scenario, &forest);
    /// assert!(report.passed());
    /// assert!(report.record("chat > execute_tool").is_some());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn validate_scenario(&self, scenario: &Scenario, forest: &SpanForest) -> ValidationReport {
        let _span = tracing::debug_span!("validate_scenario", scenario = %scenario.name, spans = forest.len()).entered();

        for orphan in forest.orphans() {
            tracing::warn!(span = %orphan.name, parent_id = ?orphan.parent_id, "captured span has no parent in capture");
        }

        let mut report = ValidationReport::new(&scenario.name);
        for root in &scenario.roots {
            match forest.find_by_name(&root.name) {
                Some(actual) => self.visit(root, actual, &root.name, &scenario.span_schemas, forest, &mut report),
                None => report.push(not_found(root, None, root.name.clone())),
            }
        }

        tracing::debug!(passed = report.passed(), records = report.records.len(), "scenario validated");
        report
    }

    fn visit(
        &self,
        expected: &ScenarioNode,
        actual: &SpanNode,
        path: &str,
        extra_schemas: &[String],
        forest: &SpanForest,
        report: &mut ValidationReport,
    ) {
        let errors = self.check_span(expected, actual, extra_schemas);
        let details = format!("matched span {}", actual.span_id);
        report.push(SpanRecord::from_errors(path, details, errors));

        for child in &expected.children {
            let child_path = format!("{path}{PATH_SEPARATOR}{}", child.name);
            match forest.find_child(&actual.span_id, &child.name) {
                Some(found) => self.visit(child, found, &child_path, &[], forest, report),
                None => report.push(not_found(child, Some(&actual.name), child_path)),
            }
        }
    }

    /// Runs every per-span check against one matched span.
    #[must_use]
    pub fn check_span(&self, expected: &ScenarioNode, actual: &SpanNode, extra_schemas: &[String]) -> Vec<ValidationError> {
        let mut errors = validate_attribute_equality(&expected.expected_attributes, &actual.attributes);
        errors.extend(validate_events_in_order(&expected.expected_events, &actual.events));
        if let Some(status) = &expected.expected_status {
            errors.extend(validate_status(status, &actual.status));
        }
        if let Some(exception) = &expected.expected_exception {
            errors.extend(validate_exception(exception, &actual.exceptions));
        }

        if let Some(schema) = &self.schema {
            let bound = expected.schema_id.iter().chain(extra_schemas);
            let mut seen: Vec<&str> = Vec::new();
            for schema_id in bound {
                if seen.contains(&schema_id.as_str()) {
                    continue;
                }
                seen.push(schema_id);
                errors.extend(schema.validate_entity(EntityKind::Span, &actual.attributes, schema_id));
            }

            for (position, (want, got)) in expected.expected_events.iter().zip(&actual.events).enumerate() {
                let Some(schema_id) = &want.schema_id else {
                    continue;
                };
                errors.extend(schema.validate_event_payload(got, schema_id).into_iter().map(|finding| {
                    ValidationError::EventAttribute { position, event: got.name.clone(), finding: Box::new(finding) }
                }));
            }
        }
        errors
    }
}

fn not_found(expected: &ScenarioNode, parent: Option<&str>, path: String) -> SpanRecord {
    let error = ValidationError::SpanNotFound {
        name: expected.name.clone(),
        parent: parent.map(str::to_string),
        skipped: expected.descendant_names(),
    };
    SpanRecord::from_errors(path, String::new(), vec![error])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error::ErrorKind;

    fn scenario(root: ScenarioNode) -> Scenario {
        Scenario {
            name: "tool".into(),
            description: String::new(),
            service_name: None,
            roots: vec![root],
            span_schemas: vec![],
        }
    }

    #[test]
    fn missing_root_does_not_recurse() {
        let expected = ScenarioNode::new("chat gpt-4o")
            .with_child(ScenarioNode::new("execute_tool get_weather").with_child(ScenarioNode::new("http GET")));
        let report = TreeValidator::new().validate_scenario(&scenario(expected), &SpanForest::default());

        assert_eq!(report.records.len(), 1);
        assert!(!report.passed());
        match &report.records[0].errors[..] {
            [ValidationError::SpanNotFound { skipped, parent: None, .. }] => {
                assert_eq!(skipped, &vec!["execute_tool get_weather".to_string(), "http GET".to_string()]);
            }
            other => panic!("unexpected errors {other:?}"),
        }
    }

    #[test]
    fn duplicate_named_siblings_match_first() {
        let expected = ScenarioNode::new("chat gpt-4o").with_child(ScenarioNode::new("execute_tool news_api_lookup"));
        let mut first_attrs = crate::domain::value::Attributes::new();
        first_attrs.insert("retry.count".into(), 0_i64.into());
        let forest = SpanForest::new(vec![
            SpanNode::new("execute_tool news_api_lookup", "b").with_parent("a").with_attributes(first_attrs),
            SpanNode::new("execute_tool news_api_lookup", "c").with_parent("a"),
            SpanNode::new("chat gpt-4o", "a"),
        ]);

        let mut expected = expected;
        expected.children[0].expected_attributes.insert("retry.count".into(), "0".into());
        let report = TreeValidator::new().validate_scenario(&scenario(expected), &forest);
        assert!(report.passed(), "{report}");
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[1].component, "chat gpt-4o > execute_tool news_api_lookup");
        assert_eq!(report.errors().filter(|e| e.kind() == ErrorKind::SpanNotFound).count(), 0);
    }
}

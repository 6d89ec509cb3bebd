use genai_otel_validator::domain::{AttributeValue, Attributes};
use genai_otel_validator::scenario::{parse, ExpectedEvent, Scenario, ScenarioNode};
use genai_otel_validator::telemetry::{SpanEvent, SpanForest, SpanNode};
use genai_otel_validator::validation::{
    validate_attribute_equality, validate_events_in_order, ErrorKind, TreeValidator, ValidationError,
};
use pretty_assertions::assert_eq;

const TOOL_SCENARIO: &str = r#"
name: Tool call
description: Chat span with a single tool child
spans:
  - name: chat gpt-4o
    expected_attributes:
      gen_ai.system: openai
    child_spans:
      - name: execute_tool get_weather
        expected_attributes:
          gen_ai.tool.name: get_weather
"#;

fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

fn expected(names: &[&str]) -> Vec<ExpectedEvent> {
    names.iter().map(|n| ExpectedEvent::new(*n, Attributes::new())).collect()
}

fn actual(names: &[&str]) -> Vec<SpanEvent> {
    names.iter().map(|n| SpanEvent::new(*n, Attributes::new())).collect()
}

#[test]
fn integer_and_string_values_compare_equal() {
    let errors = validate_attribute_equality(
        &attrs(&[("gen_ai.usage.input_tokens", AttributeValue::Int(150))]),
        &attrs(&[("gen_ai.usage.input_tokens", "150".into())]),
    );
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn integral_double_matches_its_decimal_text() {
    let expected = attrs(&[("gen_ai.request.temperature", "1.0".into())]);
    assert!(validate_attribute_equality(&expected, &attrs(&[("gen_ai.request.temperature", AttributeValue::Double(1.0))])).is_empty());

    let errors = validate_attribute_equality(&expected, &attrs(&[("gen_ai.request.temperature", AttributeValue::Int(1))]));
    assert_eq!(errors.iter().map(ValidationError::kind).collect::<Vec<_>>(), vec![ErrorKind::AttributeValueMismatch]);
}

#[test]
fn missing_and_mismatched_attributes_are_reported() {
    let errors = validate_attribute_equality(
        &attrs(&[("gen_ai.system", "openai".into()), ("gen_ai.request.model", "gpt-4o".into())]),
        &attrs(&[("gen_ai.system", "anthropic".into())]),
    );
    let kinds: Vec<ErrorKind> = errors.iter().map(ValidationError::kind).collect();
    assert_eq!(kinds, vec![ErrorKind::MissingAttribute, ErrorKind::AttributeValueMismatch]);
}

#[test]
fn extra_actual_events_are_allowed() {
    let errors = validate_events_in_order(&expected(&["A", "B"]), &actual(&["A", "B", "C"]));
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn out_of_order_events_mismatch_at_each_position() {
    let errors = validate_events_in_order(&expected(&["A", "B"]), &actual(&["B", "A"]));
    assert_eq!(
        errors,
        vec![
            ValidationError::EventNameMismatch { position: Some(0), expected: "A".into(), actual: "B".into() },
            ValidationError::EventNameMismatch { position: Some(1), expected: "B".into(), actual: "A".into() },
        ]
    );
    assert_eq!(errors[0].to_string(), "event name mismatch at position 0: expected 'A' got 'B'");
}

#[test]
fn too_few_events_stops_at_the_count() {
    let errors = validate_events_in_order(&expected(&["A", "B", "C"]), &actual(&["X"]));
    assert_eq!(errors, vec![ValidationError::EventCountShortfall { expected: 3, actual: 1 }]);
}

#[test]
fn child_is_matched_under_its_parent() {
    let scenario = parse(TOOL_SCENARIO).unwrap();
    let forest = SpanForest::new(vec![
        SpanNode::new("execute_tool get_weather", "0000000000000002")
            .with_parent("0000000000000001")
            .with_attributes(attrs(&[("gen_ai.tool.name", "get_weather".into())])),
        SpanNode::new("chat gpt-4o", "0000000000000001").with_attributes(attrs(&[("gen_ai.system", "openai".into())])),
    ]);

    let report = TreeValidator::new().validate_scenario(&scenario, &forest);
    assert!(report.passed(), "{report}");
    assert_eq!(report.records.len(), 2);
    assert!(report.record("chat gpt-4o > execute_tool get_weather").is_some());
}

#[test]
fn child_under_wrong_parent_is_not_found() {
    let scenario = parse(TOOL_SCENARIO).unwrap();
    let forest = SpanForest::new(vec![
        SpanNode::new("chat gpt-4o", "0000000000000001").with_attributes(attrs(&[("gen_ai.system", "openai".into())])),
        SpanNode::new("other", "0000000000000003"),
        SpanNode::new("execute_tool get_weather", "0000000000000002").with_parent("0000000000000003"),
    ]);

    let report = TreeValidator::new().validate_scenario(&scenario, &forest);
    assert!(!report.passed());
    let record = report.record("chat gpt-4o > execute_tool get_weather").unwrap();
    assert_eq!(
        record.errors,
        vec![ValidationError::SpanNotFound {
            name: "execute_tool get_weather".into(),
            parent: Some("chat gpt-4o".into()),
            skipped: vec![],
        }]
    );
}

#[test]
fn every_root_gets_a_record() {
    let scenario = Scenario {
        name: "two roots".into(),
        description: String::new(),
        service_name: None,
        roots: vec![ScenarioNode::new("first"), ScenarioNode::new("second")],
        span_schemas: vec![],
    };
    let forest = SpanForest::new(vec![SpanNode::new("second", "0000000000000009")]);

    let report = TreeValidator::new().validate_scenario(&scenario, &forest);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.failed_count(), 1);
    assert!(report.record("second").is_some_and(|r| r.passed));
}

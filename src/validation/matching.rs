//! Expectation matching for a single span.
//!
//! All comparisons are string-normalized and subset-based: expected keys
//! must be present with equal values, extra actual keys and trailing actual
//! events are ignored.

use super::error::ValidationError;
use crate::domain::value::Attributes;
use crate::scenario::model::{ExpectedEvent, ExpectedException, ExpectedStatus, StatusCode};
use crate::telemetry::snapshot::{ExceptionRecord, SpanEvent, SpanStatus};

/// Checks that every expected key is present with an equal value.
#[must_use]
pub fn validate_attribute_equality(expected: &Attributes, actual: &Attributes) -> Vec<ValidationError> {
    expected
        .iter()
        .filter_map(|(key, want)| match actual.get(key) {
            None => Some(ValidationError::MissingAttribute(key.clone())),
            Some(got) if !want.loosely_equals(got) => Some(ValidationError::AttributeValueMismatch {
                key: key.clone(),
                expected: want.normalized(),
                actual: got.normalized(),
            }),
            Some(_) => None,
        })
        .collect()
}

/// Checks expected events position by position.
///
/// Fewer actual events than expected is a single
/// [`ValidationError::EventCountShortfall`] and no positional checks run.
/// Otherwise each position is compared by name, then by attributes; an
/// attribute finding is wrapped in [`ValidationError::EventAttribute`].
#[must_use]
pub fn validate_events_in_order(expected: &[ExpectedEvent], actual: &[SpanEvent]) -> Vec<ValidationError> {
    if actual.len() < expected.len() {
        return vec![ValidationError::EventCountShortfall { expected: expected.len(), actual: actual.len() }];
    }

    let mut errors = Vec::new();
    for (position, (want, got)) in expected.iter().zip(actual).enumerate() {
        if want.name != got.name {
            errors.push(ValidationError::EventNameMismatch {
                position: Some(position),
                expected: want.name.clone(),
                actual: got.name.clone(),
            });
            continue;
        }
        errors.extend(
            validate_attribute_equality(&want.attributes, &got.attributes)
                .into_iter()
                .map(|finding| ValidationError::EventAttribute {
                    position,
                    event: got.name.clone(),
                    finding: Box::new(finding),
                }),
        );
    }
    errors
}

/// Checks the status code, and the description when one is expected.
#[must_use]
pub fn validate_status(expected: &ExpectedStatus, actual: &SpanStatus) -> Option<ValidationError> {
    let code_matches = matches!(
        (expected.status_code, actual),
        (StatusCode::Unset, SpanStatus::Unset) | (StatusCode::Ok, SpanStatus::Ok) | (StatusCode::Error, SpanStatus::Error(_))
    );
    let description_matches = expected
        .description
        .as_deref()
        .map_or(true, |want| actual.description() == Some(want));

    (!code_matches || !description_matches).then(|| ValidationError::StatusMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Checks that some recorded exception matches the expected type and
/// message. The expected type may also match an `error.type` attribute
/// recorded with the exception.
#[must_use]
pub fn validate_exception(expected: &ExpectedException, actual: &[ExceptionRecord]) -> Option<ValidationError> {
    let is_match = |record: &ExceptionRecord| {
        let type_ok = expected.exception_type.as_deref().map_or(true, |want| {
            record.exception_type == want
                || record.attributes.get("error.type").is_some_and(|v| v.normalized() == want)
        });
        let message_ok = expected.message.as_deref().map_or(true, |want| record.message == want);
        type_ok && message_ok
    };

    if actual.iter().any(is_match) {
        return None;
    }

    let recorded = if actual.is_empty() {
        "no exception recorded".to_string()
    } else {
        let seen: Vec<String> = actual.iter().map(|r| format!("{}: {}", r.exception_type, r.message)).collect();
        format!("recorded {}", seen.join("; "))
    };
    Some(ValidationError::ExceptionMismatch { expected: expected.to_string(), actual: recorded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::AttributeValue;
    use pretty_assertions::assert_eq;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn events(names: &[&str]) -> Vec<SpanEvent> {
        names.iter().map(|n| SpanEvent::new(*n, Attributes::new())).collect()
    }

    fn expected(names: &[&str]) -> Vec<ExpectedEvent> {
        names.iter().map(|n| ExpectedEvent::new(*n, Attributes::new())).collect()
    }

    #[test]
    fn numeric_and_text_values_compare_equal() {
        let actual = attrs(&[("gen_ai.usage.input_tokens", AttributeValue::Int(150))]);
        assert!(validate_attribute_equality(&attrs(&[("gen_ai.usage.input_tokens", "150".into())]), &actual).is_empty());

        assert_eq!(
            validate_attribute_equality(&attrs(&[("gen_ai.usage.input_tokens", AttributeValue::Int(151))]), &actual),
            vec![ValidationError::AttributeValueMismatch {
                key: "gen_ai.usage.input_tokens".into(),
                expected: "151".into(),
                actual: "150".into(),
            }]
        );
    }

    #[test]
    fn extra_actual_attributes_are_ignored_and_missing_ones_reported() {
        let actual = attrs(&[("gen_ai.system", "openai".into()), ("server.port", AttributeValue::Int(443))]);
        assert!(validate_attribute_equality(&attrs(&[("gen_ai.system", "openai".into())]), &actual).is_empty());
        assert_eq!(
            validate_attribute_equality(&attrs(&[("gen_ai.request.model", "gpt-4o".into())]), &actual),
            vec![ValidationError::MissingAttribute("gen_ai.request.model".into())]
        );
    }

    #[test]
    fn trailing_actual_events_are_ignored() {
        assert!(validate_events_in_order(&expected(&["A", "B"]), &events(&["A", "B", "C"])).is_empty());
    }

    #[test]
    fn out_of_order_events_fail_at_first_position() {
        let errors = validate_events_in_order(&expected(&["A", "B"]), &events(&["B", "A"]));
        assert_eq!(
            errors[0],
            ValidationError::EventNameMismatch { position: Some(0), expected: "A".into(), actual: "B".into() }
        );
    }

    #[test]
    fn shortfall_skips_positional_checks() {
        assert_eq!(
            validate_events_in_order(&expected(&["A", "B"]), &events(&["X"])),
            vec![ValidationError::EventCountShortfall { expected: 2, actual: 1 }]
        );
    }

    #[test]
    fn event_attribute_findings_carry_position() {
        let want = vec![ExpectedEvent::new("gen_ai.tool.message", attrs(&[("role", "tool".into())]))];
        let got = vec![SpanEvent::new("gen_ai.tool.message", attrs(&[("role", "assistant".into())]))];
        let errors = validate_events_in_order(&want, &got);
        assert!(matches!(&errors[..], [ValidationError::EventAttribute { position: 0, .. }]));
    }

    #[test]
    fn status_description_only_checked_when_expected() {
        let error = SpanStatus::Error("API rate limit exceeded".into());
        let code_only = ExpectedStatus { status_code: StatusCode::Error, description: None };
        assert!(validate_status(&code_only, &error).is_none());

        let wrong = ExpectedStatus { status_code: StatusCode::Error, description: Some("timeout".into()) };
        assert!(validate_status(&wrong, &error).is_some());
        assert!(validate_status(&code_only, &SpanStatus::Ok).is_some());
    }

    #[test]
    fn exception_matches_type_or_error_type() {
        let record = ExceptionRecord {
            exception_type: "Exception".into(),
            message: "Rate limit exceeded: try again later".into(),
            attributes: attrs(&[("error.type", "rate_limit_exceeded".into())]),
        };
        let want = ExpectedException { exception_type: Some("rate_limit_exceeded".into()), message: None };
        assert!(validate_exception(&want, std::slice::from_ref(&record)).is_none());

        let other = ExpectedException { exception_type: Some("TimeoutError".into()), message: None };
        assert!(validate_exception(&other, &[record]).is_some());
        assert!(validate_exception(&ExpectedException::default(), &[]).is_some());
    }
}

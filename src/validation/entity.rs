//! Schema-driven validation of single entities.
//!
//! [`SchemaValidator`] checks one span, event or metric sample against a
//! named schema entry. A missing entry produces exactly one
//! [`ValidationError::SchemaNotFound`] and nothing else.

use super::conditions::{ConditionEvaluator, ConditionOutcome, ConditionRules};
use super::error::ValidationError;
use super::values::ValueCheck;
use crate::domain::value::Attributes;
use crate::schema::model::{EntityKind, SchemaEntry};
use crate::schema::resolver::{resolve, resolve_payload};
use crate::schema::store::SchemaStore;
use crate::telemetry::snapshot::{MetricSample, SpanEvent};
use std::sync::Arc;

/// Validates entities against a loaded [`SchemaStore`].
pub struct SchemaValidator {
    store: Arc<SchemaStore>,
    conditions: Box<dyn ConditionEvaluator>,
    value_checks: Vec<Box<dyn ValueCheck>>,
}

impl SchemaValidator {
    /// Creates a validator that skips every conditional requirement and
    /// runs no value checks.
    #[must_use]
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self { store, conditions: Box::new(ConditionRules::new()), value_checks: Vec::new() }
    }

    #[must_use]
    pub fn with_conditions(mut self, evaluator: impl ConditionEvaluator + 'static) -> Self {
        self.conditions = Box::new(evaluator);
        self
    }

    #[must_use]
    pub fn with_value_check(mut self, check: impl ValueCheck + 'static) -> Self {
        self.value_checks.push(Box::new(check));
        self
    }

    #[must_use]
    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// Checks an attribute map against schema `schema_id` of `kind`.
    ///
    /// Event entries check body fields together with attributes, since both
    /// arrive in the event's attribute map.
    ///
    /// # Parameters
    ///
    /// * `kind` - Which family of schema entries to look `schema_id` up in
    /// * `attributes` - The entity's recorded attributes
    /// * `schema_id` - Entry id, e.g. `span.gen_ai.client`
    ///
    /// # Returns
    ///
    /// Missing required attributes in name order, then enforced conditional
    /// attributes, then value-check failures. An unknown `schema_id` yields a
    /// single [`ValidationError::SchemaNotFound`]. Empty means valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use genai_otel_validator::domain::Attributes;
    /// use genai_otel_validator::schema::{BundledSource, EntityKind, SchemaStore};
    /// use genai_otel_validator::validation::{SchemaValidator, ValidationError};
    /// use std::sync::Arc;
    ///
    /// let store = SchemaStore::from_source(&BundledSource)?;
    /// let validator = SchemaValidator::new(Arc::new(store));
    ///
    /// let mut attributes = Attributes::new();
    /// attributes.insert("gen_ai.system".into(), "openai".into());
    /// let errors = validator.validate_entity(EntityKind::Span, &attributes, "span.gen_ai.client");
    /// assert_eq!(errors, vec![ValidationError::MissingRequiredAttribute("gen_ai.operation.name".into())]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn validate_entity(&self, kind: EntityKind, attributes: &Attributes, schema_id: &str) -> Vec<ValidationError> {
        let Some(entry) = self.store.get(kind, schema_id) else {
            tracing::debug!(kind = %kind, schema_id, "schema not found");
            return vec![ValidationError::SchemaNotFound { kind, schema_id: schema_id.to_string() }];
        };
        self.check_requirements(entry, attributes)
    }

    /// Checks an event's payload and, when the schema declares one, its
    /// name.
    ///
    /// # Parameters
    ///
    /// * `event` - The recorded event, body fields included in its attributes
    /// * `schema_id` - Event entry id, e.g. `event.gen_ai.choice`
    ///
    /// # Returns
    ///
    /// An unpositioned [`ValidationError::EventNameMismatch`] first when the
    /// entry's `name` differs from the event's, followed by the same
    /// requirement findings as [`Self::validate_entity`].
    #[must_use]
    pub fn validate_event_payload(&self, event: &SpanEvent, schema_id: &str) -> Vec<ValidationError> {
        let Some(entry) = self.store.get(EntityKind::Event, schema_id) else {
            return vec![ValidationError::SchemaNotFound {
                kind: EntityKind::Event,
                schema_id: schema_id.to_string(),
            }];
        };

        let mut errors = Vec::new();
        if let Some(expected) = entry.event_name.as_deref().filter(|name| *name != event.name) {
            errors.push(ValidationError::EventNameMismatch {
                position: None,
                expected: expected.to_string(),
                actual: event.name.clone(),
            });
        }
        errors.extend(self.check_requirements(entry, &event.attributes));
        errors
    }

    /// Checks a metric sample's name and attributes.
    ///
    /// A differing `metric_name` is reported before the attribute findings.
    #[must_use]
    pub fn validate_metric(&self, sample: &MetricSample, schema_id: &str) -> Vec<ValidationError> {
        let Some(entry) = self.store.get(EntityKind::Metric, schema_id) else {
            return vec![ValidationError::SchemaNotFound {
                kind: EntityKind::Metric,
                schema_id: schema_id.to_string(),
            }];
        };

        let mut errors = Vec::new();
        if let Some(expected) = entry.metric_name.as_deref().filter(|name| *name != sample.name) {
            errors.push(ValidationError::MetricNameMismatch {
                expected: expected.to_string(),
                actual: sample.name.clone(),
            });
        }
        errors.extend(self.check_requirements(entry, &sample.attributes));
        errors
    }

    /// Finds the metric schema whose declared `metric_name` is `name`.
    #[must_use]
    pub fn metric_schema_for(&self, name: &str) -> Option<&str> {
        self.store
            .ids(EntityKind::Metric)
            .into_iter()
            .find(|id| {
                self.store
                    .get(EntityKind::Metric, id)
                    .and_then(|entry| entry.metric_name.as_deref())
                    == Some(name)
            })
    }

    fn check_requirements(&self, entry: &SchemaEntry, attributes: &Attributes) -> Vec<ValidationError> {
        let requirements = match entry.kind {
            EntityKind::Event => resolve_payload(entry),
            EntityKind::Span | EntityKind::Metric => resolve(entry),
        };

        let mut errors: Vec<ValidationError> = requirements
            .required
            .iter()
            .filter(|name| !attributes.contains_key(*name))
            .map(|name| ValidationError::MissingRequiredAttribute(name.clone()))
            .collect();

        for (name, condition) in &requirements.conditional {
            if attributes.contains_key(name) {
                continue;
            }
            if self.conditions.evaluate(name, condition, attributes) == ConditionOutcome::Enforce {
                errors.push(ValidationError::MissingConditionalAttribute {
                    attribute: name.clone(),
                    condition: condition.clone(),
                });
            }
        }

        if !self.value_checks.is_empty() {
            errors.extend(self.check_values(entry, attributes));
        }

        if !errors.is_empty() {
            tracing::debug!(schema_id = %entry.id, errors = errors.len(), "entity failed schema validation");
        }
        errors
    }

    fn check_values(&self, entry: &SchemaEntry, attributes: &Attributes) -> Vec<ValidationError> {
        let registry = self.store.registry();
        let mut errors = Vec::new();
        for attribute in entry.attributes.iter().chain(&entry.body_fields) {
            let Some(value) = attributes.get(attribute.name()) else {
                continue;
            };
            let definition = registry.resolve(attribute);
            for check in &self.value_checks {
                if let Err(message) = check.check(attribute.name(), value, definition) {
                    errors.push(ValidationError::ValueCheckFailed {
                        attribute: attribute.name().to_string(),
                        message,
                    });
                }
            }
        }
        errors
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("store", &self.store)
            .field("value_checks", &self.value_checks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::AttributeValue;
    use crate::schema::model::AttributeDef;
    use crate::schema::source::{InlineSource, SchemaDocument};
    use crate::validation::error::ErrorKind;

    const REGISTRY: &str = r"
groups:
  - id: registry.gen_ai
    type: attribute_group
    attributes:
      - id: gen_ai.system
        type:
          members:
            - id: openai
              value: openai
            - id: anthropic
              value: anthropic
";

    const SPANS: &str = r"
groups:
  - id: span.gen_ai.client
    type: span
    attributes:
      - ref: gen_ai.system
        requirement_level: required
      - ref: gen_ai.operation.name
        requirement_level: required
      - ref: error.type
        requirement_level:
          conditionally_required: If the operation ended in an error
      - ref: gen_ai.request.model
        requirement_level:
          conditionally_required: if available
";

    const EVENTS: &str = r"
groups:
  - id: event.gen_ai.choice
    type: event
    name: gen_ai.choice
    body:
      fields:
        - id: index
          requirement_level: required
";

    const METRICS: &str = r"
groups:
  - id: metric.gen_ai.client.token.usage
    type: metric
    metric_name: gen_ai.client.token.usage
    attributes:
      - ref: gen_ai.token.type
        requirement_level: required
";

    fn validator() -> SchemaValidator {
        let source = InlineSource::new()
            .with(SchemaDocument::Registry, REGISTRY)
            .with(SchemaDocument::Spans, SPANS)
            .with(SchemaDocument::Events, EVENTS)
            .with(SchemaDocument::Metrics, METRICS);
        SchemaValidator::new(Arc::new(SchemaStore::from_source(&source).unwrap()))
    }

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|(k, v)| ((*k).to_string(), AttributeValue::from(*v))).collect()
    }

    #[test]
    fn each_missing_required_attribute_is_named() {
        let validator = validator();
        let full = attrs(&[("gen_ai.system", "openai"), ("gen_ai.operation.name", "chat")]);
        assert!(validator.validate_entity(EntityKind::Span, &full, "span.gen_ai.client").is_empty());

        for dropped in ["gen_ai.system", "gen_ai.operation.name"] {
            let mut partial = full.clone();
            partial.remove(dropped);
            assert_eq!(
                validator.validate_entity(EntityKind::Span, &partial, "span.gen_ai.client"),
                vec![ValidationError::MissingRequiredAttribute(dropped.to_string())]
            );
        }
    }

    #[test]
    fn unknown_schema_yields_only_schema_not_found() {
        let errors = validator().validate_entity(EntityKind::Span, &Attributes::new(), "span.does.not.exist");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::SchemaNotFound);
    }

    #[test]
    fn conditional_attributes_follow_the_evaluator() {
        let attrs = attrs(&[("gen_ai.system", "openai"), ("gen_ai.operation.name", "chat")]);
        assert!(validator().validate_entity(EntityKind::Span, &attrs, "span.gen_ai.client").is_empty());

        let strict = validator()
            .with_conditions(ConditionRules::new().with_skip_phrases(["if available"]).enforce_unmatched(true));
        let errors = strict.validate_entity(EntityKind::Span, &attrs, "span.gen_ai.client");
        assert_eq!(
            errors,
            vec![ValidationError::MissingConditionalAttribute {
                attribute: "error.type".into(),
                condition: "If the operation ended in an error".into(),
            }]
        );
    }

    #[test]
    fn event_payload_checks_name_and_body_fields() {
        let validator = validator();
        let event = SpanEvent::new("gen_ai.choice", attrs(&[("index", "0")]));
        assert!(validator.validate_event_payload(&event, "event.gen_ai.choice").is_empty());

        let wrong = SpanEvent::new("gen_ai.assistant.message", Attributes::new());
        let kinds: Vec<ErrorKind> = validator
            .validate_event_payload(&wrong, "event.gen_ai.choice")
            .iter()
            .map(ValidationError::kind)
            .collect();
        assert_eq!(kinds, vec![ErrorKind::EventNameMismatch, ErrorKind::MissingRequiredAttribute]);
    }

    #[test]
    fn metric_checks_declared_name() {
        let validator = validator();
        let sample = MetricSample { name: "gen_ai.client.token.usage".into(), attributes: attrs(&[("gen_ai.token.type", "input")]) };
        assert!(validator.validate_metric(&sample, "metric.gen_ai.client.token.usage").is_empty());
        assert_eq!(validator.metric_schema_for("gen_ai.client.token.usage"), Some("metric.gen_ai.client.token.usage"));

        let renamed = MetricSample { name: "tokens".into(), ..sample };
        assert_eq!(validator.validate_metric(&renamed, "metric.gen_ai.client.token.usage").len(), 1);
    }

    #[test]
    fn value_checks_see_registry_definitions() {
        let validator = validator().with_value_check(
            |name: &str, value: &AttributeValue, def: Option<&AttributeDef>| -> Result<(), String> {
                let allowed = def.and_then(|d| d.allowed_values.as_ref());
                match allowed {
                    Some(values) if !values.contains(&value.normalized()) => Err(format!("{name} not in {values:?}")),
                    _ => Ok(()),
                }
            },
        );
        let attrs = attrs(&[("gen_ai.system", "mystery"), ("gen_ai.operation.name", "chat")]);
        let errors = validator.validate_entity(EntityKind::Span, &attrs, "span.gen_ai.client");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::ValueCheckFailed);
    }
}

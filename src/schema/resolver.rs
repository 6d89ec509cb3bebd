//! Requirement resolution for schema entries.
//!
//! Splits an entry's attribute list into required, conditionally-required
//! and optional (recommended or optional) sets. Pure and deterministic, so
//! results can be cached per entry.

use super::model::{AttributeRef, RequirementLevel, SchemaEntry};
use std::collections::{BTreeMap, BTreeSet};

/// Attribute names of one entry, classified by requirement level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    pub required: BTreeSet<String>,
    /// Attribute name to its unevaluated condition text.
    pub conditional: BTreeMap<String, String>,
    pub optional: BTreeSet<String>,
}

impl RequirementSet {
    fn classify(&mut self, attribute: &AttributeRef) {
        let name = attribute.name().to_string();
        match &attribute.requirement {
            RequirementLevel::Required => {
                self.required.insert(name);
            }
            RequirementLevel::ConditionallyRequired(condition) => {
                self.conditional.insert(name, condition.clone());
            }
            RequirementLevel::Recommended | RequirementLevel::Optional => {
                self.optional.insert(name);
            }
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.required.extend(other.required);
        self.conditional.extend(other.conditional);
        self.optional.extend(other.optional);
        self
    }
}

/// Classifies the entry's attribute list.
#[must_use]
pub fn resolve(entry: &SchemaEntry) -> RequirementSet {
    resolve_list(&entry.attributes)
}

/// Classifies the entry's event body fields.
#[must_use]
pub fn resolve_fields(entry: &SchemaEntry) -> RequirementSet {
    resolve_list(&entry.body_fields)
}

/// Classifies attributes and body fields together.
///
/// Event payload validation checks both against the event's attribute map.
#[must_use]
pub fn resolve_payload(entry: &SchemaEntry) -> RequirementSet {
    resolve(entry).merge(resolve_fields(entry))
}

fn resolve_list(attributes: &[AttributeRef]) -> RequirementSet {
    let mut set = RequirementSet::default();
    for attribute in attributes {
        set.classify(attribute);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{AttributeDef, AttributeSource, EntityKind};

    fn attr(source: AttributeSource, requirement: RequirementLevel) -> AttributeRef {
        AttributeRef { source, requirement }
    }

    #[test]
    fn classifies_by_level_using_effective_name() {
        let entry = SchemaEntry {
            id: "span.test".into(),
            kind: EntityKind::Span,
            brief: None,
            attributes: vec![
                attr(AttributeSource::Reference("gen_ai.system".into()), RequirementLevel::Required),
                attr(
                    AttributeSource::Inline(AttributeDef {
                        id: "inline.required".into(),
                        value_type: None,
                        allowed_values: None,
                    }),
                    RequirementLevel::Required,
                ),
                attr(
                    AttributeSource::Reference("gen_ai.response.model".into()),
                    RequirementLevel::ConditionallyRequired("if available".into()),
                ),
                attr(AttributeSource::Reference("gen_ai.request.top_p".into()), RequirementLevel::Recommended),
                attr(AttributeSource::Reference("server.port".into()), RequirementLevel::Optional),
            ],
            event_name: None,
            body_fields: vec![],
            metric_name: None,
        };

        let set = resolve(&entry);
        assert_eq!(set.required.iter().collect::<Vec<_>>(), vec!["gen_ai.system", "inline.required"]);
        assert_eq!(set.conditional.get("gen_ai.response.model").map(String::as_str), Some("if available"));
        assert_eq!(set.optional.len(), 2);
        assert_eq!(resolve(&entry), set);
    }
}

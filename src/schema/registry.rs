//! Shared attribute registry.

use super::model::{AttributeDef, AttributeRef, AttributeSource, RawDocument};
use std::collections::HashMap;

/// Mapping from attribute id to its shared definition.
///
/// Populated from the registry document, where every group (usually of type
/// `attribute_group`) contributes its inline attribute definitions.
#[derive(Debug, Default, Clone)]
pub struct AttributeRegistry {
    attributes: HashMap<String, AttributeDef>,
}

impl AttributeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition; a later definition of the same id replaces the
    /// earlier one.
    pub fn insert(&mut self, def: AttributeDef) {
        self.attributes.insert(def.id.clone(), def);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AttributeDef> {
        self.attributes.get(id)
    }

    /// Resolves the definition behind an attribute entry.
    ///
    /// Inline entries resolve to themselves; references resolve through the
    /// registry and yield `None` when dangling.
    #[must_use]
    pub fn resolve<'a>(&'a self, attribute: &'a AttributeRef) -> Option<&'a AttributeDef> {
        match &attribute.source {
            AttributeSource::Reference(id) => self.get(id),
            AttributeSource::Inline(def) => Some(def),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub(crate) fn extend_from(&mut self, document: RawDocument) {
        for group in document.groups {
            for attribute in group.attributes {
                if let Some(def) = attribute.into_def() {
                    self.insert(def);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::RequirementLevel;

    #[test]
    fn resolves_references_and_inline_definitions() {
        let mut registry = AttributeRegistry::new();
        registry.insert(AttributeDef {
            id: "gen_ai.system".into(),
            value_type: Some("string".into()),
            allowed_values: None,
        });

        let reference = AttributeRef {
            source: AttributeSource::Reference("gen_ai.system".into()),
            requirement: RequirementLevel::Required,
        };
        let dangling = AttributeRef {
            source: AttributeSource::Reference("gen_ai.unknown".into()),
            requirement: RequirementLevel::Required,
        };

        assert_eq!(registry.resolve(&reference).and_then(|d| d.value_type.as_deref()), Some("string"));
        assert!(registry.resolve(&dangling).is_none());
    }
}

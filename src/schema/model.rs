//! Schema data model and its YAML wire format.
//!
//! Convention documents are lists of `groups`. Each group carries a `type`
//! (`span`, `event`, `metric`, `attribute_group`, ...) and a list of
//! attribute entries that either reference a registry attribute (`ref`) or
//! define one inline (`id`).
//!
//! ```yaml
//! groups:
//!   - id: span.gen_ai.client
//!     type: span
//!     attributes:
//!       - ref: gen_ai.system
//!         requirement_level: required
//!       - ref: gen_ai.response.model
//!         requirement_level:
//!           conditionally_required: if available
//! ```

use serde::Deserialize;
use std::fmt;

/// Kind of telemetry entity a schema entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Span,
    Event,
    Metric,
}

impl EntityKind {
    /// Parses a group `type` tag. Unrecognized tags yield `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "span" => Some(Self::Span),
            "event" => Some(Self::Event),
            "metric" => Some(Self::Metric),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Event => "event",
            Self::Metric => "metric",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requirement level of an attribute within one schema entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementLevel {
    Required,
    Recommended,
    Optional,
    /// Required only when the (opaque, human-readable) condition holds.
    ConditionallyRequired(String),
}

/// Shared attribute definition, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub id: String,
    /// Declared type tag (`string`, `int`, `string[]`, ...). Enumerated
    /// attributes carry the tag of their members' values when known.
    pub value_type: Option<String>,
    /// Allowed values for enumerated attributes.
    pub allowed_values: Option<Vec<String>>,
}

/// Where an attribute entry gets its definition from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSource {
    /// Resolved against the shared [`AttributeRegistry`](super::AttributeRegistry).
    Reference(String),
    Inline(AttributeDef),
}

/// An attribute as listed by a schema entry, with its entry-local level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRef {
    pub source: AttributeSource,
    pub requirement: RequirementLevel,
}

impl AttributeRef {
    /// Effective attribute name: the `ref` if present, else the inline `id`.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.source {
            AttributeSource::Reference(id) => id,
            AttributeSource::Inline(def) => &def.id,
        }
    }
}

/// One schema entry (span kind, event kind or metric kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub id: String,
    pub kind: EntityKind,
    pub brief: Option<String>,
    pub attributes: Vec<AttributeRef>,
    /// Expected event name (event entries only).
    pub event_name: Option<String>,
    /// Event payload fields (event entries only).
    pub body_fields: Vec<AttributeRef>,
    /// Expected instrument name (metric entries only).
    pub metric_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGroup {
    pub id: String,
    #[serde(rename = "type", default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<RawAttribute>,
    #[serde(default)]
    pub body: Option<RawBody>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawBody {
    #[serde(default)]
    pub fields: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAttribute {
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub value_type: Option<RawType>,
    #[serde(default)]
    pub requirement_level: Option<RawRequirement>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawType {
    Named(String),
    Enum { members: Vec<RawMember> },
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMember {
    #[serde(default)]
    pub id: Option<String>,
    pub value: serde_yaml_ng::Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawRequirement {
    Level(String),
    Conditional { conditionally_required: String },
    RecommendedWhen { recommended: String },
}

impl RawRequirement {
    fn into_level(self) -> RequirementLevel {
        match self {
            Self::Level(level) => match level.as_str() {
                "required" => RequirementLevel::Required,
                "recommended" => RequirementLevel::Recommended,
                "optional" | "opt_in" => RequirementLevel::Optional,
                other => {
                    tracing::debug!(level = %other, "unknown requirement level, treating as optional");
                    RequirementLevel::Optional
                }
            },
            Self::Conditional { conditionally_required } => {
                RequirementLevel::ConditionallyRequired(conditionally_required)
            }
            Self::RecommendedWhen { .. } => RequirementLevel::Recommended,
        }
    }
}

impl RawType {
    fn into_parts(self) -> (Option<String>, Option<Vec<String>>) {
        match self {
            Self::Named(name) => (Some(name), None),
            Self::Enum { members } => {
                let value_type = members.first().map(|m| yaml_type_tag(&m.value).to_string());
                let values = members.into_iter().map(|m| yaml_scalar(&m.value)).collect();
                (value_type, Some(values))
            }
        }
    }
}

fn yaml_type_tag(value: &serde_yaml_ng::Value) -> &'static str {
    match value {
        serde_yaml_ng::Value::Bool(_) => "boolean",
        serde_yaml_ng::Value::Number(n) if n.is_f64() => "double",
        serde_yaml_ng::Value::Number(_) => "int",
        _ => "string",
    }
}

fn yaml_scalar(value: &serde_yaml_ng::Value) -> String {
    match value {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

impl RawAttribute {
    /// Converts a wire attribute into an [`AttributeRef`].
    ///
    /// Entries with neither `ref` nor `id` are unusable and yield `None`.
    /// A missing `requirement_level` defaults to optional.
    pub(crate) fn into_ref(self) -> Option<AttributeRef> {
        let requirement = self
            .requirement_level
            .map_or(RequirementLevel::Optional, RawRequirement::into_level);

        let source = if let Some(reference) = self.reference {
            AttributeSource::Reference(reference)
        } else {
            let id = self.id?;
            let (value_type, allowed_values) =
                self.value_type.map_or((None, None), RawType::into_parts);
            AttributeSource::Inline(AttributeDef { id, value_type, allowed_values })
        };

        Some(AttributeRef { source, requirement })
    }

    /// Converts a registry attribute into its shared definition.
    pub(crate) fn into_def(self) -> Option<AttributeDef> {
        let id = self.id?;
        let (value_type, allowed_values) = self.value_type.map_or((None, None), RawType::into_parts);
        Some(AttributeDef { id, value_type, allowed_values })
    }
}

impl RawGroup {
    /// Converts a wire group into a schema entry when its `type` names an
    /// entity kind; other groups are ignored.
    pub(crate) fn into_entry(self) -> Option<SchemaEntry> {
        let kind = EntityKind::from_tag(self.group_type.as_deref()?)?;
        let attributes = self.attributes.into_iter().filter_map(RawAttribute::into_ref).collect();
        let body_fields = self
            .body
            .map(|body| body.fields.into_iter().filter_map(RawAttribute::into_ref).collect())
            .unwrap_or_default();

        Some(SchemaEntry {
            id: self.id,
            kind,
            brief: self.brief,
            attributes,
            event_name: if kind == EntityKind::Event { self.name } else { None },
            body_fields,
            metric_name: self.metric_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_requirement_variants() {
        let doc: RawDocument = serde_yaml_ng::from_str(
            r"
groups:
  - id: span.test
    type: span
    attributes:
      - ref: a.required
        requirement_level: required
      - ref: a.conditional
        requirement_level:
          conditionally_required: if available
      - ref: a.recommended
        requirement_level:
          recommended: when streaming
      - id: a.inline
        type: string
",
        )
        .unwrap();

        let entry = doc.groups.into_iter().next().and_then(RawGroup::into_entry).unwrap();
        let levels: Vec<_> = entry.attributes.iter().map(|a| (a.name(), a.requirement.clone())).collect();
        assert_eq!(
            levels,
            vec![
                ("a.required", RequirementLevel::Required),
                ("a.conditional", RequirementLevel::ConditionallyRequired("if available".into())),
                ("a.recommended", RequirementLevel::Recommended),
                ("a.inline", RequirementLevel::Optional),
            ]
        );
    }

    #[test]
    fn ignores_unrecognized_group_types() {
        let doc: RawDocument = serde_yaml_ng::from_str(
            "groups:\n  - id: registry.gen_ai\n    type: attribute_group\n  - id: untyped\n",
        )
        .unwrap();
        assert!(doc.groups.into_iter().all(|g| g.into_entry().is_none()));
    }

    #[test]
    fn enum_members_become_allowed_values() {
        let doc: RawDocument = serde_yaml_ng::from_str(
            r"
groups:
  - id: registry.gen_ai
    type: attribute_group
    attributes:
      - id: gen_ai.operation.name
        type:
          members:
            - id: chat
              value: chat
            - id: execute_tool
              value: execute_tool
",
        )
        .unwrap();
        let def = doc.groups.into_iter().next().unwrap().attributes.into_iter().next().unwrap().into_def().unwrap();
        assert_eq!(def.value_type.as_deref(), Some("string"));
        assert_eq!(def.allowed_values, Some(vec!["chat".to_string(), "execute_tool".to_string()]));
    }
}

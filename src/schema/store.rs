//! Load-once schema store.
//!
//! Holds three independent id-keyed maps (spans, events, metrics) plus the
//! shared attribute registry. The store has a single `Empty -> Ready`
//! transition: the first successful [`SchemaStore::load`] populates it and
//! every later call is a no-op.

use super::model::{AttributeSource, EntityKind, RawDocument, SchemaEntry};
use super::registry::AttributeRegistry;
use super::source::{SchemaDocument, SchemaSource};
use crate::domain::error::SchemaLoadError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreState {
    Empty,
    Ready,
}

/// Semantic-convention schema store.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    state: StoreState,
    spans: HashMap<String, SchemaEntry>,
    events: HashMap<String, SchemaEntry>,
    metrics: HashMap<String, SchemaEntry>,
    registry: AttributeRegistry,
    unavailable: Vec<SchemaDocument>,
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: StoreState::Empty,
            spans: HashMap::new(),
            events: HashMap::new(),
            metrics: HashMap::new(),
            registry: AttributeRegistry::new(),
            unavailable: Vec::new(),
        }
    }

    /// Creates a store and loads it from `source`.
    ///
    /// # Errors
    ///
    /// See [`SchemaStore::load`].
    pub fn from_source(source: &dyn SchemaSource) -> Result<Self, SchemaLoadError> {
        let mut store = Self::new();
        store.load(source)?;
        Ok(store)
    }

    /// Populates the store from `source`.
    ///
    /// Groups whose `type` is not `span`, `event` or `metric` are ignored
    /// (registry groups are read from the registry document only). Documents
    /// the source cannot provide are recorded as unavailable and contribute
    /// no entries. Calling `load` on a ready store does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::Parse`] when a document is malformed, in
    /// which case the store stays empty.
    pub fn load(&mut self, source: &dyn SchemaSource) -> Result<(), SchemaLoadError> {
        if self.state == StoreState::Ready {
            tracing::debug!("schema store already loaded, skipping");
            return Ok(());
        }
        let _span = tracing::debug_span!("schema_store_load").entered();

        let mut loaded = Self::new();
        for document in SchemaDocument::ALL {
            let Some(text) = source.read(document)? else {
                loaded.unavailable.push(document);
                continue;
            };
            let raw: RawDocument = serde_yaml_ng::from_str::<Option<RawDocument>>(&text)
                .map_err(|e| SchemaLoadError::Parse {
                    document: document.file_name().to_string(),
                    message: e.to_string(),
                })?
                .unwrap_or_default();

            if document == SchemaDocument::Registry {
                loaded.registry.extend_from(raw);
            } else {
                for entry in raw.groups.into_iter().filter_map(|g| g.into_entry()) {
                    loaded.map_mut(entry.kind).insert(entry.id.clone(), entry);
                }
            }
        }

        loaded.warn_dangling_references();
        loaded.state = StoreState::Ready;
        *self = loaded;

        tracing::info!(
            spans = self.spans.len(),
            events = self.events.len(),
            metrics = self.metrics.len(),
            registry = self.registry.len(),
            "loaded schemas"
        );
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state == StoreState::Ready
    }

    /// Looks up an entry by exact id. A miss is not an error.
    #[must_use]
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&SchemaEntry> {
        self.map(kind).get(id)
    }

    /// Sorted ids of all entries of one kind.
    #[must_use]
    pub fn ids(&self, kind: EntityKind) -> Vec<&str> {
        let mut ids: Vec<&str> = self.map(kind).keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub const fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Documents the source could not provide during load.
    #[must_use]
    pub fn unavailable(&self) -> &[SchemaDocument] {
        &self.unavailable
    }

    const fn map(&self, kind: EntityKind) -> &HashMap<String, SchemaEntry> {
        match kind {
            EntityKind::Span => &self.spans,
            EntityKind::Event => &self.events,
            EntityKind::Metric => &self.metrics,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut HashMap<String, SchemaEntry> {
        match kind {
            EntityKind::Span => &mut self.spans,
            EntityKind::Event => &mut self.events,
            EntityKind::Metric => &mut self.metrics,
        }
    }

    fn warn_dangling_references(&self) {
        if self.registry.is_empty() {
            return;
        }
        let entries = self.spans.values().chain(self.events.values()).chain(self.metrics.values());
        for entry in entries {
            for attribute in entry.attributes.iter().chain(&entry.body_fields) {
                if let AttributeSource::Reference(id) = &attribute.source {
                    if self.registry.get(id).is_none() {
                        tracing::debug!(schema_id = %entry.id, attribute = %id, "reference not in registry");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::resolver::resolve;
    use crate::schema::source::InlineSource;

    const SPANS: &str = r"
groups:
  - id: span.gen_ai.client
    type: span
    attributes:
      - ref: gen_ai.system
        requirement_level: required
  - id: event.misplaced
    type: event
    name: misplaced
  - id: registry.ignored
    type: attribute_group
";

    #[test]
    fn indexes_groups_by_their_type() {
        let store = SchemaStore::from_source(&InlineSource::new().with(SchemaDocument::Spans, SPANS)).unwrap();
        assert!(store.get(EntityKind::Span, "span.gen_ai.client").is_some());
        assert!(store.get(EntityKind::Event, "event.misplaced").is_some());
        assert!(store.get(EntityKind::Span, "registry.ignored").is_none());
        assert!(store.get(EntityKind::Metric, "span.gen_ai.client").is_none());
    }

    #[test]
    fn second_load_is_a_noop() {
        let source = InlineSource::new().with(SchemaDocument::Spans, SPANS);
        let mut store = SchemaStore::new();
        store.load(&source).unwrap();
        let first = resolve(store.get(EntityKind::Span, "span.gen_ai.client").unwrap());

        store.load(&InlineSource::new()).unwrap();
        let second = resolve(store.get(EntityKind::Span, "span.gen_ai.client").unwrap());
        assert_eq!(first, second);
        assert_eq!(store.ids(EntityKind::Span), vec!["span.gen_ai.client"]);
    }

    #[test]
    fn absent_documents_are_recorded() {
        let store = SchemaStore::from_source(&InlineSource::new()).unwrap();
        assert!(store.is_loaded());
        assert_eq!(store.unavailable().len(), 4);
    }

    #[test]
    fn malformed_document_is_fatal_and_leaves_store_empty() {
        let mut store = SchemaStore::new();
        let err = store
            .load(&InlineSource::new().with(SchemaDocument::Metrics, "groups: [unclosed"))
            .unwrap_err();
        assert!(matches!(err, SchemaLoadError::Parse { .. }));
        assert!(!store.is_loaded());
    }

    #[test]
    fn empty_document_has_no_entries() {
        let store = SchemaStore::from_source(&InlineSource::new().with(SchemaDocument::Spans, "")).unwrap();
        assert!(store.ids(EntityKind::Span).is_empty());
    }
}

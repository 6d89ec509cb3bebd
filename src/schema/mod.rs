//! Semantic-convention schema loading and requirement resolution.
//!
//! # Architecture
//!
//! ```text
//! SchemaSource (dir / bundled / inline) → SchemaStore → resolver::resolve
//!                                              │
//!                                     AttributeRegistry
//! ```
//!
//! # Modules
//!
//! - [`model`]: Entry, attribute and requirement-level types
//! - [`registry`]: Shared attribute definitions referenced by `ref`
//! - [`source`]: Where schema documents come from (plus the fetch seam)
//! - [`store`]: Load-once, id-keyed store of span/event/metric entries
//! - [`resolver`]: Required / conditional / optional classification

pub mod model;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod store;

pub use model::{AttributeDef, AttributeRef, AttributeSource, EntityKind, RequirementLevel, SchemaEntry};
pub use registry::AttributeRegistry;
pub use resolver::{resolve, resolve_fields, resolve_payload, RequirementSet};
#[cfg(feature = "remote")]
pub use source::HttpFetcher;
pub use source::{
    BundledSource, DirectorySource, InlineSource, SchemaDocument, SchemaFetcher, SchemaSource,
    DEFAULT_SCHEMA_BASE_URL,
};
pub use store::SchemaStore;

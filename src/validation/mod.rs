//! Schema and scenario validation.
//!
//! Validators are pure functions over immutable snapshots. They never fail
//! on a mismatch; findings accumulate as [`ValidationError`]s and reports,
//! and the caller decides what is fatal.
//!
//! # Modules
//!
//! - [`error`]: Finding taxonomy
//! - [`conditions`]: Conditional-requirement evaluators
//! - [`values`]: Attribute value check hook
//! - [`entity`]: Span / event / metric checks against one schema entry
//! - [`matching`]: Expected-vs-actual attribute, event, status and exception checks
//! - [`tree`]: Span-tree matching against a scenario
//! - [`report`]: Per-span records and overall outcome

pub mod conditions;
pub mod entity;
pub mod error;
pub mod matching;
pub mod report;
pub mod tree;
pub mod values;

pub use conditions::{ConditionEvaluator, ConditionOutcome, ConditionRules};
pub use entity::SchemaValidator;
pub use error::{ErrorKind, ValidationError};
pub use matching::{validate_attribute_equality, validate_events_in_order, validate_exception, validate_status};
pub use report::{SpanRecord, ValidationReport};
pub use tree::TreeValidator;
pub use values::ValueCheck;

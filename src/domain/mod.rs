//! Domain layer shared by every other module.
//!
//! # Organization
//!
//! - [`error`]: Fatal error types and result aliases
//! - [`value`]: Loosely typed attribute values and attribute maps

pub mod error;
pub mod value;

pub use error::{Result, ScenarioError, SchemaLoadError, ValidatorError};
pub use value::{AttributeValue, Attributes};

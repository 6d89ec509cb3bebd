//! Attribute value check hook.
//!
//! Presence is all the schema validator enforces by default. A
//! [`ValueCheck`] can be registered to inspect each present attribute along
//! with its registry definition (declared type, allowed values). None ship
//! with the crate.

use crate::domain::value::AttributeValue;
use crate::schema::model::AttributeDef;

/// Checks one present attribute value.
pub trait ValueCheck: Send + Sync {
    /// Returns a human-readable reason when the value is unacceptable.
    ///
    /// `definition` is `None` when the attribute's registry reference does
    /// not resolve.
    ///
    /// # Errors
    ///
    /// The `Err` string becomes a `ValueCheckFailed` finding.
    fn check(&self, attribute: &str, value: &AttributeValue, definition: Option<&AttributeDef>) -> Result<(), String>;
}

impl<F> ValueCheck for F
where
    F: Fn(&str, &AttributeValue, Option<&AttributeDef>) -> Result<(), String> + Send + Sync,
{
    fn check(&self, attribute: &str, value: &AttributeValue, definition: Option<&AttributeDef>) -> Result<(), String> {
        self(attribute, value, definition)
    }
}

//! Error types for the validator.
//!
//! This module defines the fatal error types raised while loading inputs
//! (schemas, scenarios, trace files, configuration) and the crate-wide
//! [`ValidatorError`]. Findings produced while *validating* telemetry are
//! not errors in this sense; they are accumulated as
//! [`crate::validation::ValidationError`] values instead.

use thiserror::Error;

/// Failure while loading semantic-convention schema documents.
///
/// Only malformed documents are fatal. A document that cannot be found or
/// fetched is reported through [`SchemaLoadError::Unavailable`] by the
/// sources, and the store downgrades it to "no entries" for that document.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    /// A schema document was present but could not be parsed.
    #[error("failed to parse schema document {document}: {message}")]
    Parse {
        /// Logical document name (e.g. `spans.yaml`).
        document: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A schema document could not be read or fetched.
    #[error("schema document {document} unavailable: {reason}")]
    Unavailable {
        /// Logical document name (e.g. `spans.yaml`).
        document: String,
        /// Why the document is missing.
        reason: String,
    },

    /// Filesystem failure while reading a schema document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while loading a scenario definition.
///
/// A scenario that fails with either variant never reaches execution or
/// validation.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// One of the always-required top-level keys is absent.
    #[error("scenario missing required key: {0}")]
    MissingField(&'static str),

    /// The scenario source is not well-formed.
    #[error("failed to parse scenario: {0}")]
    ParseError(String),

    /// The scenario file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The main error type for validator operations.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Schema documents could not be loaded.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaLoadError),

    /// A scenario could not be loaded.
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// The telemetry producer or capture boundary failed.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// A captured trace file could not be decoded.
    #[error("Trace file error: {0}")]
    TraceFile(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for validator operations.
pub type Result<T> = std::result::Result<T, ValidatorError>;

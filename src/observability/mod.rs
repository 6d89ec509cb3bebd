//! Logging and file-based trace export.
//!
//! # Architecture
//!
//! ```text
//! tracing macros → EnvFilter → fmt layer (stderr)
//!
//! TelemetryContext → OpenTelemetry SDK → OtlpFileExporter → RotatingFileWriter
//! ```
//!
//! Logging describes what the validator itself is doing. The exporter
//! writes the telemetry under test to disk in OTLP JSON so a run can be
//! inspected or re-validated later with the `check` command.
//!
//! # Configuration
//!
//! Log level comes from `RUST_LOG`, then `--debug`, then `log_level` in the
//! config file (default `"info"`). The trace file path is `export_file`;
//! `--skip-export` disables it.
//!
//! # Modules
//!
//! - [`init`]: Subscriber setup
//! - [`exporter`]: OTLP JSON span exporter
//! - [`file_writer`]: Rotating line writer

pub mod exporter;
pub mod file_writer;
mod init;

pub use exporter::OtlpFileExporter;
pub use file_writer::RotatingFileWriter;
pub use init::init_logging;

//! Telemetry production, capture and snapshots.
//!
//! # Architecture
//!
//! ```text
//! TelemetryContext ──start_span/add_event──▶ OpenTelemetry SDK
//!                                                │ simple processors
//!                                   ┌────────────┴─────────────┐
//!                             CaptureExporter           OtlpFileExporter
//!                                   │                        │
//!                             CaptureBuffer             trace file (otlp)
//!                                   │
//!                    SettlePolicy ─▶ SpanForest ─▶ validation
//! ```
//!
//! # Modules
//!
//! - [`snapshot`]: Read-only span forest model
//! - [`producer`]: Explicit telemetry context and scoped spans
//! - [`capture`]: In-memory exporter and SDK conversion
//! - [`settle`]: Flush-and-wait policy
//! - [`otlp`]: OTLP JSON encode/decode

pub mod capture;
pub mod otlp;
pub mod producer;
pub mod settle;
pub mod snapshot;

pub use capture::CaptureBuffer;
pub use producer::{CurrentSpan, ScopedSpan, TelemetryContext};
pub use settle::{SettlePolicy, DEFAULT_SETTLE_DELAY};
pub use snapshot::{ExceptionRecord, MetricSample, SpanEvent, SpanForest, SpanNode, SpanStatus};

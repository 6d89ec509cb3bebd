//! OTLP/JSON file span exporter.
//!
//! Stands in for a network collector: each exported batch becomes one OTLP
//! JSON document appended as a single line to a rotating trace file. The
//! `check` command reads these files back through
//! [`crate::telemetry::otlp::read_trace_file`].

use super::file_writer::RotatingFileWriter;
use crate::domain::value::{from_key_values, Attributes};
use crate::telemetry::capture::span_node_from_data;
use crate::telemetry::otlp::encode_document;
use futures_util::future::BoxFuture;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Span exporter that writes OTLP JSON lines to a file.
pub struct OtlpFileExporter {
    writer: RotatingFileWriter,
    resource: Attributes,
    is_shutdown: AtomicBool,
}

impl OtlpFileExporter {
    /// Creates an exporter writing to `path` with the given resource
    /// attributes. The provider may later replace the resource through
    /// `set_resource`.
    #[must_use]
    pub fn new(path: PathBuf, resource: &Resource) -> Self {
        Self {
            writer: RotatingFileWriter::new(path),
            resource: resource_attributes(resource),
            is_shutdown: AtomicBool::new(false),
        }
    }
}

fn resource_attributes(resource: &Resource) -> Attributes {
    let pairs: Vec<opentelemetry::KeyValue> = resource
        .iter()
        .map(|(k, v)| opentelemetry::KeyValue::new(k.clone(), v.clone()))
        .collect();
    from_key_values(&pairs)
}

impl SpanExporter for OtlpFileExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Box::pin(std::future::ready(Err(TraceError::from("exporter is shut down"))));
        }

        let spans: Vec<_> = batch.iter().map(span_node_from_data).collect();
        let line = encode_document(&self.resource, &spans).to_string();

        let result = self.writer.write_line(&line).map_err(|e| {
            tracing::warn!(path = %self.writer.path().display(), error = %e, "failed to write trace file");
            TraceError::from(e.to_string())
        });
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource_attributes(resource);
    }
}

impl std::fmt::Debug for OtlpFileExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtlpFileExporter")
            .field("writer", &self.writer)
            .field("is_shutdown", &self.is_shutdown)
            .finish_non_exhaustive()
    }
}

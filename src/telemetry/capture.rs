//! In-memory capture of finished spans.
//!
//! [`CaptureExporter`] is an OpenTelemetry `SpanExporter` that converts each
//! finished span into a [`SpanNode`] and appends it to a shared
//! [`CaptureBuffer`]. The buffer is the capture/export boundary the
//! validator reads from.

use super::snapshot::{SpanEvent, SpanNode, SpanStatus};
use crate::domain::value::from_key_values;
use futures_util::future::BoxFuture;
use opentelemetry::trace::{SpanId, TraceError};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Shared, ordered buffer of finished spans.
///
/// Cloning yields another handle to the same buffer. Concurrent scenarios
/// sharing one buffer are unsupported; callers serialize runs and clear the
/// buffer between them.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    spans: Arc<Mutex<Vec<SpanNode>>>,
}

impl CaptureBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all finished spans in export order.
    #[must_use]
    pub fn finished_spans(&self) -> Vec<SpanNode> {
        self.spans.lock().map(|spans| spans.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Drops every captured span.
    pub fn clear(&self) {
        match self.spans.lock() {
            Ok(mut spans) => spans.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn extend(&self, batch: impl IntoIterator<Item = SpanNode>) -> Result<(), TraceError> {
        let mut spans = self
            .spans
            .lock()
            .map_err(|e| TraceError::from(format!("capture buffer poisoned: {e}")))?;
        spans.extend(batch);
        drop(spans);
        Ok(())
    }
}

/// Span exporter writing into a [`CaptureBuffer`].
pub(crate) struct CaptureExporter {
    buffer: CaptureBuffer,
    is_shutdown: AtomicBool,
}

impl CaptureExporter {
    pub(crate) const fn new(buffer: CaptureBuffer) -> Self {
        Self { buffer, is_shutdown: AtomicBool::new(false) }
    }
}

impl SpanExporter for CaptureExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Box::pin(std::future::ready(Err(TraceError::from("capture exporter is shut down"))));
        }

        tracing::trace!(count = batch.len(), "capturing finished spans");
        let result = self.buffer.extend(batch.iter().map(span_node_from_data));
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for CaptureExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureExporter")
            .field("is_shutdown", &self.is_shutdown)
            .finish_non_exhaustive()
    }
}

/// Converts SDK span data into the snapshot model.
///
/// # Parameters
///
/// * `span` - A finished span as handed to the exporter
///
/// # Returns
///
/// A [`SpanNode`] whose span id is 16-char lowercase hex and trace id 32-char
/// hex. An invalid parent span id marks a root. `exception` events stay in
/// [`SpanNode::events`] and are also decoded into [`SpanNode::exceptions`].
#[must_use]
pub fn span_node_from_data(span: &SpanData) -> SpanNode {
    let status = match &span.status {
        opentelemetry::trace::Status::Unset => SpanStatus::Unset,
        opentelemetry::trace::Status::Ok => SpanStatus::Ok,
        opentelemetry::trace::Status::Error { description } => SpanStatus::Error(description.to_string()),
    };

    let events = span
        .events
        .iter()
        .map(|event| SpanEvent {
            name: event.name.to_string(),
            attributes: from_key_values(&event.attributes),
            time_unix_nano: unix_nanos(event.timestamp),
        })
        .collect();

    let mut node = SpanNode {
        name: span.name.to_string(),
        trace_id: format!("{:032x}", span.span_context.trace_id()),
        span_id: format!("{:016x}", span.span_context.span_id()),
        parent_id: (span.parent_span_id != SpanId::INVALID).then(|| format!("{:016x}", span.parent_span_id)),
        attributes: from_key_values(&span.attributes),
        events,
        status,
        exceptions: Vec::new(),
        start_time_unix_nano: unix_nanos(span.start_time),
        end_time_unix_nano: unix_nanos(span.end_time),
    };
    node.collect_exceptions();
    node
}

fn unix_nanos(time: SystemTime) -> u64 {
    let nanos = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::from_secs(0)).as_nanos();
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

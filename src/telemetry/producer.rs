//! Telemetry producer backed by the OpenTelemetry SDK.
//!
//! [`TelemetryContext`] is an explicit handle owning one tracer provider, its
//! in-memory capture buffer and (optionally) a trace-file exporter. Nothing
//! is registered globally: every component that emits or reads telemetry is
//! handed the context.
//!
//! Spans nest implicitly. [`TelemetryContext::start_span`] makes the new span
//! current for as long as the returned [`ScopedSpan`] lives, so a span
//! started inside that scope becomes its child. Dropping the guard ends the
//! span on every exit path, including `?` and panics.

use super::capture::{CaptureBuffer, CaptureExporter};
use super::snapshot::{MetricSample, SpanForest, SpanNode, SpanStatus, EXCEPTION_EVENT_NAME};
use crate::domain::value::{to_key_values, Attributes};
use crate::domain::{Result, ValidatorError};
use crate::observability::OtlpFileExporter;
use opentelemetry::trace::{Status, TraceContextExt, Tracer as _, TracerProvider as _};
use opentelemetry::{Context, ContextGuard, KeyValue};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const TRACER_NAME: &str = "genai-otel-validator";

/// Owns the tracer provider and capture buffer for one validation session.
pub struct TelemetryContext {
    provider: TracerProvider,
    tracer: Tracer,
    capture: CaptureBuffer,
    metrics: Arc<Mutex<Vec<MetricSample>>>,
    service_name: String,
}

impl TelemetryContext {
    /// Creates a context whose spans are captured in memory only.
    #[must_use]
    pub fn new(service_name: &str) -> Self {
        Self::with_export(service_name, None)
    }

    /// Creates a context that additionally appends every finished span to
    /// `export_file` as OTLP JSON.
    ///
    /// # Parameters
    ///
    /// * `service_name` - Recorded as the `service.name` resource attribute
    /// * `export_file` - JSON-lines trace file, created on first export; `None` captures in memory only
    #[must_use]
    pub fn with_export(service_name: &str, export_file: Option<PathBuf>) -> Self {
        let resource = Resource::new(vec![KeyValue::new("service.name", service_name.to_string())]);
        let capture = CaptureBuffer::new();

        let mut builder = TracerProvider::builder()
            .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource.clone()))
            .with_simple_exporter(CaptureExporter::new(capture.clone()));
        if let Some(path) = export_file {
            tracing::debug!(path = %path.display(), "exporting spans to file");
            builder = builder.with_simple_exporter(OtlpFileExporter::new(path, &resource));
        }
        let provider = builder.build();
        let tracer = provider.tracer(TRACER_NAME);

        Self {
            provider,
            tracer,
            capture,
            metrics: Arc::new(Mutex::new(Vec::new())),
            service_name: service_name.to_string(),
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Starts a span as a child of the current span and makes it current.
    ///
    /// The span ends when the returned guard is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use genai_otel_validator::domain::Attributes;
    /// use genai_otel_validator::telemetry::TelemetryContext;
    ///
    /// let telemetry = TelemetryContext::new("agent");
    /// {
    ///     let _chat = telemetry.start_span("chat gpt-4o", &Attributes::new());
    ///     let tool = telemetry.start_span("execute_tool get_weather", &Attributes::new());
    ///     tool.add_event("gen_ai.tool.message", &Attributes::new());
    /// }
    ///
    /// let forest = telemetry.snapshot();
    /// let chat = forest.find_by_name("chat gpt-4o").unwrap();
    /// assert!(forest.find_child(&chat.span_id, "execute_tool get_weather").is_some());
    /// ```
    #[must_use = "the span ends as soon as the guard is dropped"]
    pub fn start_span(&self, name: &str, attributes: &Attributes) -> ScopedSpan {
        let span = self
            .tracer
            .span_builder(name.to_string())
            .with_attributes(to_key_values(attributes))
            .start(&self.tracer);
        let cx = Context::current_with_span(span);
        let guard = cx.clone().attach();
        tracing::trace!(span = name, "started span");
        ScopedSpan { span: CurrentSpan { cx }, _guard: guard }
    }

    /// Handle to whichever span is current on this thread.
    ///
    /// Operations on the handle are no-ops when no span is active.
    #[must_use]
    pub fn current_span(&self) -> CurrentSpan {
        CurrentSpan { cx: Context::current() }
    }

    /// Records one metric data point for later validation.
    pub fn record_metric(&self, name: &str, attributes: &Attributes) {
        let sample = MetricSample { name: name.to_string(), attributes: attributes.clone() };
        match self.metrics.lock() {
            Ok(mut metrics) => metrics.push(sample),
            Err(poisoned) => poisoned.into_inner().push(sample),
        }
    }

    /// Finished spans in export order.
    #[must_use]
    pub fn get_finished_spans(&self) -> Vec<SpanNode> {
        self.capture.finished_spans()
    }

    /// Finished spans as a forest.
    #[must_use]
    pub fn snapshot(&self) -> SpanForest {
        SpanForest::new(self.get_finished_spans())
    }

    #[must_use]
    pub fn recorded_metrics(&self) -> Vec<MetricSample> {
        self.metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Empties the capture buffer and recorded metrics.
    pub fn clear(&self) {
        self.capture.clear();
        match self.metrics.lock() {
            Ok(mut metrics) => metrics.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Asks every span processor to export whatever it still holds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Telemetry`] carrying the first processor
    /// failure.
    pub fn force_flush(&self) -> Result<()> {
        self.provider
            .force_flush()
            .into_iter()
            .find_map(std::result::Result::err)
            .map_or(Ok(()), |e| Err(ValidatorError::Telemetry(e.to_string())))
    }
}

impl std::fmt::Debug for TelemetryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryContext")
            .field("service_name", &self.service_name)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// Handle for adding events, status and exceptions to a span.
#[derive(Debug, Clone)]
pub struct CurrentSpan {
    cx: Context,
}

impl CurrentSpan {
    /// Appends an event. Event order is preserved.
    pub fn add_event(&self, name: &str, attributes: &Attributes) {
        self.cx.span().add_event(name.to_string(), to_key_values(attributes));
    }

    pub fn set_status(&self, status: &SpanStatus) {
        let status = match status {
            SpanStatus::Unset => Status::Unset,
            SpanStatus::Ok => Status::Ok,
            SpanStatus::Error(description) => Status::error(description.clone()),
        };
        self.cx.span().set_status(status);
    }

    /// Records an exception as an `exception` event carrying
    /// `exception.type`, `exception.message` and any extra attributes.
    pub fn record_exception(&self, exception_type: &str, message: &str, attributes: &Attributes) {
        let mut kvs = vec![
            KeyValue::new("exception.type", exception_type.to_string()),
            KeyValue::new("exception.message", message.to_string()),
        ];
        kvs.extend(to_key_values(attributes));
        self.cx.span().add_event(EXCEPTION_EVENT_NAME, kvs);
    }

    /// Records a Rust error, using its type name as `exception.type`.
    pub fn record_error<E: std::error::Error>(&self, error: &E, attributes: &Attributes) {
        let full = std::any::type_name::<E>();
        let short = full.rsplit("::").next().unwrap_or(full);
        self.record_exception(short, &error.to_string(), attributes);
    }

    /// Lowercase hex id of the span, or all zeroes when no span is active.
    #[must_use]
    pub fn span_id(&self) -> String {
        format!("{:016x}", self.cx.span().span_context().span_id())
    }
}

/// An open span that is current for its lifetime.
///
/// Dereferences to [`CurrentSpan`] for events, status and exceptions. Not
/// `Send`: the span is attached to the thread that started it.
pub struct ScopedSpan {
    span: CurrentSpan,
    _guard: ContextGuard,
}

impl std::ops::Deref for ScopedSpan {
    type Target = CurrentSpan;

    fn deref(&self) -> &Self::Target {
        &self.span
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        self.span.cx.span().end();
    }
}

impl std::fmt::Debug for ScopedSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSpan").field("span_id", &self.span.span_id()).finish_non_exhaustive()
    }
}

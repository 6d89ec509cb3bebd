//! Scenario validation reports.

use super::error::ValidationError;
use std::fmt;

/// Outcome for one span definition (or one extra check such as a metric).
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    /// Path of the span definition, e.g. `chat gpt-4o > execute_tool get_weather`.
    pub component: String,
    pub passed: bool,
    /// Human-readable summary.
    pub details: String,
    pub errors: Vec<ValidationError>,
}

impl SpanRecord {
    /// Builds a record that passes exactly when `errors` is empty.
    #[must_use]
    pub fn from_errors(component: impl Into<String>, success_details: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        let details = if errors.is_empty() {
            success_details.into()
        } else {
            errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
        };
        Self { component: component.into(), passed: errors.is_empty(), details, errors }
    }
}

/// Per-span-definition results for one scenario.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub scenario: String,
    pub records: Vec<SpanRecord>,
}

impl ValidationReport {
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self { scenario: scenario.into(), records: Vec::new() }
    }

    pub fn push(&mut self, record: SpanRecord) {
        self.records.push(record);
    }

    /// True when every record passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.records.iter().all(|r| r.passed)
    }

    /// All accumulated findings, in record order.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.records.iter().flat_map(|r| r.errors.iter())
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.passed).count()
    }

    /// Looks up a record by component path.
    #[must_use]
    pub fn record(&self, component: &str) -> Option<&SpanRecord> {
        self.records.iter().find(|r| r.component == component)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario)?;
        let width = self.records.iter().map(|r| r.component.chars().count()).max().unwrap_or(0);
        for record in &self.records {
            let status = if record.passed { "PASS" } else { "FAIL" };
            writeln!(f, "  {:<width$}  {status}  {}", record.component, record.details)?;
        }
        if self.passed() {
            write!(f, "Result: passed ({} checks)", self.records.len())
        } else {
            write!(f, "Result: failed ({} of {} checks)", self.failed_count(), self.records.len())
        }
    }
}

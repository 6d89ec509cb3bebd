//! Scenario execution.
//!
//! A run moves through a fixed sequence of phases:
//!
//! ```text
//! Loaded → Executing → AwaitingExport → Validating → Reported
//! ```
//!
//! - **Executing**: a [`ScenarioDriver`] emits telemetry through the
//!   [`TelemetryContext`]
//! - **AwaitingExport**: the [`SettlePolicy`] flushes and waits
//! - **Validating**: the captured forest is matched against the scenario
//!
//! Runs are serialized: the capture buffer is cleared at the start of each
//! run and owned by that run until the next one starts.

use super::model::{Scenario, ScenarioNode};
use crate::domain::value::Attributes;
use crate::domain::Result;
use crate::telemetry::producer::TelemetryContext;
use crate::telemetry::settle::SettlePolicy;
use crate::validation::report::{SpanRecord, ValidationReport};
use crate::validation::tree::TreeValidator;
use std::fmt;
use std::path::PathBuf;

/// Service name used when a scenario does not configure one.
pub const DEFAULT_SERVICE_NAME: &str = "scenario-test";

/// Phase of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Loaded,
    Executing,
    AwaitingExport,
    Validating,
    Reported,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::Executing => "executing",
            Self::AwaitingExport => "awaiting export",
            Self::Validating => "validating",
            Self::Reported => "reported",
        })
    }
}

/// Emits the telemetry a scenario is checked against.
pub trait ScenarioDriver {
    /// Produces spans, events and metrics through `telemetry`.
    ///
    /// # Errors
    ///
    /// A failing driver aborts the run before validation.
    fn drive(&self, scenario: &Scenario, telemetry: &TelemetryContext) -> Result<()>;
}

/// Driver that emits exactly what the scenario expects.
///
/// Each definition becomes a span carrying its expected attributes, then its
/// expected events in order, its expected status and exception, and finally
/// its children. Useful for exercising scenario files and the validator
/// without application code.
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorDriver;

impl MirrorDriver {
    fn emit(node: &ScenarioNode, telemetry: &TelemetryContext) {
        let span = telemetry.start_span(&node.name, &node.expected_attributes);
        for event in &node.expected_events {
            span.add_event(&event.name, &event.attributes);
        }
        if let Some(status) = &node.expected_status {
            span.set_status(&status.to_status());
        }
        if let Some(exception) = &node.expected_exception {
            let exception_type = exception.exception_type.as_deref().unwrap_or("Exception");
            let mut attributes = Attributes::new();
            attributes.insert("error.type".to_string(), exception_type.into());
            span.record_exception(exception_type, exception.message.as_deref().unwrap_or_default(), &attributes);
        }
        for child in &node.children {
            Self::emit(child, telemetry);
        }
    }
}

impl ScenarioDriver for MirrorDriver {
    fn drive(&self, scenario: &Scenario, telemetry: &TelemetryContext) -> Result<()> {
        for root in &scenario.roots {
            Self::emit(root, telemetry);
        }
        Ok(())
    }
}

/// Runs scenarios end to end.
#[derive(Debug)]
pub struct ScenarioRunner {
    validator: TreeValidator,
    settle: SettlePolicy,
    export_file: Option<PathBuf>,
    default_service_name: String,
    phase: RunPhase,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(validator: TreeValidator) -> Self {
        Self {
            validator,
            settle: SettlePolicy::default(),
            export_file: None,
            default_service_name: DEFAULT_SERVICE_NAME.to_string(),
            phase: RunPhase::Loaded,
        }
    }

    #[must_use]
    pub const fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    /// Also writes every captured span to `path` as OTLP JSON.
    #[must_use]
    pub fn with_export_file(mut self, path: Option<PathBuf>) -> Self {
        self.export_file = path;
        self
    }

    #[must_use]
    pub fn with_default_service_name(mut self, name: impl Into<String>) -> Self {
        self.default_service_name = name.into();
        self
    }

    /// Phase reached by the most recent run.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub const fn validator(&self) -> &TreeValidator {
        &self.validator
    }

    /// Runs `scenario` in a fresh telemetry context named after the
    /// scenario's `service_name` (or the runner default).
    ///
    /// # Errors
    ///
    /// Driver and flush failures abort the run. Validation mismatches do
    /// not: they are in the returned report.
    pub fn run(&mut self, scenario: &Scenario, driver: &dyn ScenarioDriver) -> Result<ValidationReport> {
        let service_name = scenario.service_name.as_deref().unwrap_or(&self.default_service_name);
        let telemetry = TelemetryContext::with_export(service_name, self.export_file.clone());
        self.run_with(scenario, driver, &telemetry)
    }

    /// Runs `scenario` against a caller-owned telemetry context. The
    /// context's capture buffer is cleared first.
    ///
    /// # Errors
    ///
    /// See [`ScenarioRunner::run`].
    pub fn run_with(
        &mut self,
        scenario: &Scenario,
        driver: &dyn ScenarioDriver,
        telemetry: &TelemetryContext,
    ) -> Result<ValidationReport> {
        let _span = tracing::info_span!("scenario_run", scenario = %scenario.name).entered();
        self.enter(RunPhase::Loaded);
        telemetry.clear();

        self.enter(RunPhase::Executing);
        driver.drive(scenario, telemetry)?;

        self.enter(RunPhase::AwaitingExport);
        self.settle.settle(telemetry)?;

        self.enter(RunPhase::Validating);
        let forest = telemetry.snapshot();
        let mut report = self.validator.validate_scenario(scenario, &forest);
        self.validate_metrics(telemetry, &mut report);

        self.enter(RunPhase::Reported);
        tracing::info!(passed = report.passed(), failed = report.failed_count(), "scenario finished");
        Ok(report)
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(phase = %phase, "scenario phase");
        self.phase = phase;
    }

    /// Adds one record per recorded metric that has a matching metric
    /// schema.
    fn validate_metrics(&self, telemetry: &TelemetryContext, report: &mut ValidationReport) {
        let Some(schema) = self.validator.schema() else {
            return;
        };
        for sample in telemetry.recorded_metrics() {
            let Some(schema_id) = schema.metric_schema_for(&sample.name) else {
                tracing::debug!(metric = %sample.name, "no schema for metric, skipping");
                continue;
            };
            let errors = schema.validate_metric(&sample, schema_id);
            report.push(SpanRecord::from_errors(
                format!("metric {}", sample.name),
                format!("conforms to {schema_id}"),
                errors,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::parse::parse;

    const BASIC: &str = r#"
name: Basic chat
description: One chat span with two messages
configuration:
  service_name: agent-service
spans:
  - name: chat claude-3-opus
    expected_attributes:
      gen_ai.system: anthropic
      gen_ai.request.model: claude-3-opus
    expected_events:
      - name: gen_ai.user.message
      - name: gen_ai.assistant.message
"#;

    struct Failing;

    impl ScenarioDriver for Failing {
        fn drive(&self, _: &Scenario, _: &TelemetryContext) -> Result<()> {
            Err(crate::domain::ValidatorError::Telemetry("driver failed".into()))
        }
    }

    #[test]
    fn mirror_driver_satisfies_its_own_scenario() {
        let scenario = parse(BASIC).unwrap();
        let mut runner = ScenarioRunner::new(TreeValidator::new()).with_settle(SettlePolicy::immediate());

        let report = runner.run(&scenario, &MirrorDriver).unwrap();
        assert!(report.passed(), "{report}");
        assert_eq!(report.records.len(), 1);
        assert_eq!(runner.phase(), RunPhase::Reported);
    }

    #[test]
    fn driver_failure_stops_before_validation() {
        let scenario = parse(BASIC).unwrap();
        let mut runner = ScenarioRunner::new(TreeValidator::new()).with_settle(SettlePolicy::immediate());

        assert!(runner.run(&scenario, &Failing).is_err());
        assert_eq!(runner.phase(), RunPhase::Executing);
    }

    #[test]
    fn shared_context_is_cleared_between_runs() {
        let scenario = parse(BASIC).unwrap();
        let telemetry = TelemetryContext::new("agent-service");
        let mut runner = ScenarioRunner::new(TreeValidator::new()).with_settle(SettlePolicy::immediate());

        runner.run_with(&scenario, &MirrorDriver, &telemetry).unwrap();
        runner.run_with(&scenario, &MirrorDriver, &telemetry).unwrap();
        assert_eq!(telemetry.get_finished_spans().len(), 1);
    }
}

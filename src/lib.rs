//! GenAI OpenTelemetry validator: checks emitted span trees against
//! semantic-convention schemas and declarative scenarios.
//!
//! The crate provides:
//! - A load-once store of span, event and metric conventions with a shared
//!   attribute registry
//! - Required / conditional / optional attribute resolution
//! - Expected-vs-actual matching of span trees, ordered events, status and
//!   exceptions
//! - An explicit telemetry context that captures spans in memory (and
//!   optionally exports them as OTLP JSON)
//! - Four built-in GenAI instrumentation tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  CLI (main.rs)                                      │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Scenario Layer (scenario/, builtin)                │  ← Run state machine
//! │  - YAML parsing                                     │
//! │  - Drivers (mirror, built-in producers)             │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Validation    │   │ Schema        │   │ Telemetry     │
//! │ (validation/) │   │ (schema/)     │   │ (telemetry/)  │
//! │ - Tree match  │   │ - Store       │   │ - Producer    │
//! │ - Findings    │   │ - Resolver    │   │ - Capture     │
//! │ - Reports     │   │ - Sources     │   │ - OTLP JSON   │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (domain/): errors, attribute values         │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │
//! │  - Logging subscriber                               │
//! │  - Rotating OTLP JSON file export                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Configuration
//!
//! All settings are optional and read from a TOML file:
//!
//! ```toml
//! service_name = "scenario-test"
//! schema_dir = "./schemas"
//! fetch_missing_schemas = false
//! settle_delay_ms = 500
//! export_file = "./traces/spans.jsonl"
//! log_level = "info"
//! condition_phrases = ["if available"]
//! enforce_conditions = false
//! ```
//!
//! # Examples
//!
//! ```rust
//! use genai_otel_validator::builtin::BuiltinTest;
//! use genai_otel_validator::telemetry::SettlePolicy;
//! use genai_otel_validator::{Config, ScenarioRunner};
//!
//! let config = Config::default();
//! let validator = config.tree_validator()?;
//! let mut runner = ScenarioRunner::new(validator).with_settle(SettlePolicy::immediate());
//!
//! let test = BuiltinTest::Tool;
//! let report = runner.run(&test.scenario()?, &test)?;
//! assert!(report.passed());
//! # Ok::<(), genai_otel_validator::ValidatorError>(())
//! ```

pub mod builtin;
pub mod domain;
pub mod observability;
pub mod scenario;
pub mod schema;
pub mod telemetry;
pub mod validation;

pub use domain::{AttributeValue, Attributes, Result, ValidatorError};
pub use scenario::{MirrorDriver, Scenario, ScenarioDriver, ScenarioRunner};
pub use telemetry::{SettlePolicy, TelemetryContext};
pub use validation::{SchemaValidator, TreeValidator, ValidationReport};

use schema::{BundledSource, DirectorySource, SchemaSource, SchemaStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use validation::ConditionRules;

/// Validator configuration.
///
/// Every field has a default, so an empty file (or no file) is valid.
/// Command-line flags override individual fields after loading.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Service name for runs whose scenario does not set
    /// `configuration.service_name`. Default: `"scenario-test"`
    pub service_name: String,

    /// Directory holding `spans.yaml`, `events.yaml`, `metrics.yaml` and
    /// `registry.yaml`. When unset the bundled GenAI conventions are used.
    pub schema_dir: Option<PathBuf>,

    /// Download documents missing from `schema_dir`. Needs the `remote`
    /// feature; ignored otherwise.
    pub fetch_missing_schemas: bool,

    /// Base URL for schema downloads.
    pub schema_base_url: String,

    /// Flush-then-wait delay before capture is inspected. Default: 500
    pub settle_delay_ms: u64,

    /// OTLP JSON lines file receiving every exported span.
    pub export_file: Option<PathBuf>,

    /// Fallback log level when `RUST_LOG` is unset. Default: `"info"`
    pub log_level: String,

    /// Conditions containing any of these phrases are skipped.
    pub condition_phrases: Vec<String>,

    /// Enforce conditional attributes whose condition matches no phrase.
    pub enforce_conditions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: scenario::DEFAULT_SERVICE_NAME.to_string(),
            schema_dir: None,
            fetch_missing_schemas: false,
            schema_base_url: schema::DEFAULT_SCHEMA_BASE_URL.to_string(),
            settle_delay_ms: telemetry::settle::DEFAULT_SETTLE_DELAY.as_millis().try_into().unwrap_or(500),
            export_file: None,
            log_level: "info".to_string(),
            condition_phrases: vec!["if available".to_string()],
            enforce_conditions: false,
        }
    }
}

impl Config {
    /// Reads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Io`] if the file cannot be read and
    /// [`ValidatorError::Config`] if it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = ?path, "loaded configuration");
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ValidatorError::Config`] on malformed TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ValidatorError::Config(e.to_string()))
    }

    #[must_use]
    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy::fixed(Duration::from_millis(self.settle_delay_ms))
    }

    /// Condition evaluator built from `condition_phrases` and
    /// `enforce_conditions`.
    #[must_use]
    pub fn condition_rules(&self) -> ConditionRules {
        ConditionRules::new()
            .with_skip_phrases(self.condition_phrases.iter().cloned())
            .enforce_unmatched(self.enforce_conditions)
    }

    /// Where schema documents come from under this configuration.
    #[must_use]
    pub fn schema_source(&self) -> Box<dyn SchemaSource> {
        let Some(dir) = &self.schema_dir else {
            return Box::new(BundledSource);
        };
        let source = DirectorySource::new(dir);
        if !self.fetch_missing_schemas {
            return Box::new(source);
        }

        #[cfg(feature = "remote")]
        {
            Box::new(source.with_fetcher(Box::new(schema::HttpFetcher::new(self.schema_base_url.clone()))))
        }
        #[cfg(not(feature = "remote"))]
        {
            tracing::warn!("fetch_missing_schemas is set but the remote feature is disabled");
            Box::new(source)
        }
    }

    /// Loads the schema store.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Schema`] when a present document cannot
    /// be parsed.
    pub fn schema_store(&self) -> Result<SchemaStore> {
        let store = SchemaStore::from_source(self.schema_source().as_ref())?;
        for missing in store.unavailable() {
            tracing::warn!(document = missing.file_name(), "schema document unavailable");
        }
        Ok(store)
    }

    /// A tree validator that enforces schema bindings with this
    /// configuration's condition policy.
    ///
    /// # Errors
    ///
    /// See [`Config::schema_store`].
    pub fn tree_validator(&self) -> Result<TreeValidator> {
        let schema = SchemaValidator::new(Arc::new(self.schema_store()?)).with_conditions(self.condition_rules());
        Ok(TreeValidator::with_schema(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
        assert_eq!(Config::default().settle_delay_ms, 500);
        assert_eq!(Config::default().service_name, "scenario-test");
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::from_toml(
            r#"
service_name = "agent"
settle_delay_ms = 0
condition_phrases = ["when set"]
enforce_conditions = true
"#,
        )
        .unwrap();
        assert_eq!(config.service_name, "agent");
        assert_eq!(config.settle_policy().delay(), Duration::ZERO);
        assert_eq!(config.condition_phrases, vec!["when set".to_string()]);
        assert!(config.enforce_conditions);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("scan_depth = 4").unwrap_err();
        assert!(matches!(err, ValidatorError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().log_level, "debug");
    }

    #[test]
    fn bundled_schemas_load_by_default() {
        let store = Config::default().schema_store().unwrap();
        assert!(store.get(schema::EntityKind::Span, "span.gen_ai.client").is_some());
        assert!(store.unavailable().is_empty());
    }
}

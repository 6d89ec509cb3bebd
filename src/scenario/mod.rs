//! Declarative scenarios: model, parsing and execution.
//!
//! # Modules
//!
//! - [`model`]: Expected span trees
//! - [`parse`]: YAML parsing with required-key checks
//! - [`runner`]: Run phases, drivers and the scenario runner

pub mod model;
pub mod parse;
pub mod runner;

pub use model::{ExpectedEvent, ExpectedException, ExpectedStatus, Scenario, ScenarioNode, StatusCode};
pub use parse::{load, parse};
pub use runner::{MirrorDriver, RunPhase, ScenarioDriver, ScenarioRunner, DEFAULT_SERVICE_NAME};

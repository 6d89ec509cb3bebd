use clap::{Args, Parser, Subcommand, ValueEnum};
use genai_otel_validator::builtin::BuiltinTest;
use genai_otel_validator::observability::init_logging;
use genai_otel_validator::scenario::load as load_scenario;
use genai_otel_validator::schema::EntityKind;
use genai_otel_validator::telemetry::otlp::read_trace_file;
use genai_otel_validator::{Config, MirrorDriver, Result, ScenarioRunner, ValidationReport};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "genai-otel-validator", version)]
#[command(about = "Validate GenAI OpenTelemetry spans against semantic conventions and scenarios", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not write captured spans to the configured export file.
    #[arg(long, global = true)]
    skip_export: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    debug: bool,

    /// Directory containing the convention YAML documents.
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,

    /// Milliseconds to wait for span export before validating.
    #[arg(long, global = true)]
    settle_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a scenario file and validate what it emits.
    Run {
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Run the built-in GenAI tests.
    Suite {
        #[arg(long, value_enum, default_value_t = SuiteSelection::All)]
        test: SuiteSelection,
    },
    /// Validate a previously exported OTLP JSON trace file against a scenario.
    Check {
        #[arg(long)]
        scenario: PathBuf,

        #[arg(long)]
        trace_file: PathBuf,
    },
    /// List the loaded schema ids.
    Schemas,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SuiteSelection {
    Basic,
    Reasoning,
    Tool,
    Error,
    All,
}

impl SuiteSelection {
    fn tests(self) -> Vec<BuiltinTest> {
        match self {
            Self::Basic => vec![BuiltinTest::Basic],
            Self::Reasoning => vec![BuiltinTest::Reasoning],
            Self::Tool => vec![BuiltinTest::Tool],
            Self::Error => vec![BuiltinTest::Error],
            Self::All => BuiltinTest::ALL.to_vec(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log_level, cli.global.debug);

    match execute(cli.cmd, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "validation aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Config file first, then command-line overrides.
fn resolve_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &global.schema_dir {
        config.schema_dir = Some(dir.clone());
    }
    if let Some(ms) = global.settle_ms {
        config.settle_delay_ms = ms;
    }
    if global.skip_export {
        config.export_file = None;
    }
    Ok(config)
}

fn runner(config: &Config) -> Result<ScenarioRunner> {
    Ok(ScenarioRunner::new(config.tree_validator()?)
        .with_settle(config.settle_policy())
        .with_export_file(config.export_file.clone())
        .with_default_service_name(config.service_name.clone()))
}

/// Returns whether every report passed.
fn execute(cmd: Commands, config: &Config) -> Result<bool> {
    match cmd {
        Commands::Run { scenario } => {
            let scenario = load_scenario(&scenario)?;
            let report = runner(config)?.run(&scenario, &MirrorDriver)?;
            Ok(print_report(&report))
        }
        Commands::Suite { test } => {
            let mut runner = runner(config)?;
            let mut all_passed = true;
            for builtin in test.tests() {
                let report = runner.run(&builtin.scenario()?, &builtin)?;
                all_passed &= print_report(&report);
            }
            Ok(all_passed)
        }
        Commands::Check { scenario, trace_file } => {
            let scenario = load_scenario(&scenario)?;
            let forest = read_trace_file(&trace_file)?;
            tracing::info!(spans = forest.len(), path = ?trace_file, "loaded trace file");
            let report = config.tree_validator()?.validate_scenario(&scenario, &forest);
            Ok(print_report(&report))
        }
        Commands::Schemas => {
            let store = config.schema_store()?;
            for kind in [EntityKind::Span, EntityKind::Event, EntityKind::Metric] {
                println!("{kind}:");
                for id in store.ids(kind) {
                    println!("  {id}");
                }
            }
            println!("registry attributes: {}", store.registry().len());
            Ok(true)
        }
    }
}

fn print_report(report: &ValidationReport) -> bool {
    println!("{report}");
    report.passed()
}

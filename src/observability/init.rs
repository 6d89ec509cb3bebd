//! Logging subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the process-wide logging subscriber.
///
/// # Level Resolution
///
/// 1. `RUST_LOG` if set and valid
/// 2. `debug` when `debug` is true
/// 3. `level` (usually the configured `log_level`)
///
/// Output goes to stderr so that stdout carries only the validation
/// report. Calling this more than once is harmless: only the first call
/// installs a subscriber.
pub fn init_logging(level: &str, debug: bool) {
    let fallback = if debug { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

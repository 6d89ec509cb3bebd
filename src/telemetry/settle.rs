//! Export settling between emission and validation.
//!
//! The producer offers no "export complete" signal, so the runner flushes
//! and then waits a fixed, configurable interval before reading the
//! capture snapshot.

use super::producer::TelemetryContext;
use crate::domain::Result;
use std::time::Duration;

/// Default wait after flushing.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Flush-then-wait policy applied before a snapshot is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    delay: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_SETTLE_DELAY)
    }
}

impl SettlePolicy {
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Flush only, no wait.
    #[must_use]
    pub const fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Requests a flush, then blocks for the configured delay.
    ///
    /// # Errors
    ///
    /// Propagates flush failures from the telemetry context.
    pub fn settle(&self, telemetry: &TelemetryContext) -> Result<()> {
        telemetry.force_flush()?;
        if !self.delay.is_zero() {
            tracing::debug!(delay_ms = self.delay.as_millis(), "waiting for export to settle");
            std::thread::sleep(self.delay);
        }
        Ok(())
    }
}

// Sweep Scheduler
// Periodic remediation sweeps, one at a time

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::constants::{DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_SWEEP_ON_START};
use crate::application::RemediationSweeper;
use crate::domain::SweepReport;
use crate::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Sweep schedule configuration
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Seconds between sweeps
    pub interval_secs: u64,

    /// Sweep once immediately instead of waiting a full interval
    pub run_on_start: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            run_on_start: DEFAULT_SWEEP_ON_START,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(AppError::Config(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sweep scheduler
///
/// Runs `RemediationSweeper::sweep_report` every `interval_secs`. Sweeps
/// triggered here never overlap: the next tick is only awaited once the
/// current sweep has returned, and missed ticks are skipped.
pub struct SweepScheduler {
    sweeper: Arc<RemediationSweeper>,
    config: SweepConfig,
}

impl SweepScheduler {
    pub fn new(sweeper: Arc<RemediationSweeper>, config: SweepConfig) -> Self {
        Self { sweeper, config }
    }

    /// Run the sweep loop until `shutdown` fires
    ///
    /// A failed sweep is logged and the loop keeps going; the next tick
    /// re-scans from scratch. Should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownToken) -> Result<u64> {
        self.config.validate()?;

        info!(
            interval_secs = self.config.interval_secs,
            run_on_start = self.config.run_on_start,
            "Sweep scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !self.config.run_on_start {
            // First tick completes immediately
            tick.tick().await;
        }

        let mut completed: u64 = 0;
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!(completed_sweeps = completed, "Sweep scheduler stopping");
                    return Ok(completed);
                }
                _ = tick.tick() => {}
            }

            match self.sweeper.sweep_report().await {
                Ok(report) => {
                    completed += 1;
                    log_report(&report);
                }
                Err(e) => {
                    error!(error = ?e, "Scheduled sweep failed");
                }
            }
        }
    }

    /// Sweep immediately (for manual trigger)
    pub async fn run_now(&self) -> Result<SweepReport> {
        info!("Running manual sweep...");
        let report = self.sweeper.sweep_report().await?;
        log_report(&report);
        Ok(report)
    }
}

fn log_report(report: &SweepReport) {
    if report.unresolved() > 0 {
        warn!(
            scanned = report.scanned(),
            unresolved = report.unresolved(),
            "Sweep left unresolved instances"
        );
    } else {
        info!(scanned = report.scanned(), "Sweep resolved every instance");
    }
}

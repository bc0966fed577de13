// Remediation Sweeper - one termination attempt per stuck instance
use crate::application::scanner::{release, InstanceScanner};
use crate::domain::{CompletionStatus, DiagnosticRecord, SweepReport, TerminationOutcome};
use crate::error::Result;
use crate::port::{OperationsClient, OperationsConnection, TimeProvider};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Remediation sweeper
///
/// Scans for running or suspended instances and issues exactly one
/// termination command per instance, in discovery order, over a write
/// connection distinct from the scanner's read connection.
///
/// Algorithm:
/// 1. Open the write connection
/// 2. Scan (the scanner opens and releases its own connection)
/// 3. Terminate each discovered instance once; no retries, no reordering
/// 4. Turn every non-succeeded outcome into a `DiagnosticRecord` indexed by
///    its position in the full discovery sequence
/// 5. Emit each record at WARN and return them
pub struct RemediationSweeper {
    client: Arc<dyn OperationsClient>,
    scanner: InstanceScanner,
    time_provider: Arc<dyn TimeProvider>,
}

impl RemediationSweeper {
    /// Create a new sweeper
    ///
    /// # Arguments
    /// * `client` - Operations service client (both connections come from it)
    /// * `time_provider` - Time provider for sweep timestamps
    ///
    /// # Example
    /// ```ignore
    /// let sweeper = RemediationSweeper::new(client, Arc::new(SystemTimeProvider));
    /// let unresolved = sweeper.sweep().await?;
    /// ```
    pub fn new(client: Arc<dyn OperationsClient>, time_provider: Arc<dyn TimeProvider>) -> Self {
        let scanner = InstanceScanner::new(Arc::clone(&client));
        Self::with_scanner(client, scanner, time_provider)
    }

    /// Create a sweeper with an explicitly built scanner
    pub fn with_scanner(
        client: Arc<dyn OperationsClient>,
        scanner: InstanceScanner,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            client,
            scanner,
            time_provider,
        }
    }

    pub fn scanner(&self) -> &InstanceScanner {
        &self.scanner
    }

    /// Run one sweep and return the instances that could not be terminated
    ///
    /// Succeeds even when every termination failed; an empty result means
    /// nothing is left to alert on.
    pub async fn sweep(&self) -> Result<Vec<DiagnosticRecord>> {
        Ok(self.sweep_report().await?.diagnostics)
    }

    /// Run one sweep and return every outcome alongside the diagnostics
    ///
    /// # Errors
    /// Fails without issuing any termination when the write connection
    /// cannot be opened or the scan fails.
    pub async fn sweep_report(&self) -> Result<SweepReport> {
        let started_at = self.time_provider.now_millis();
        info!("Starting remediation sweep");

        let mut writer = self.client.open_connection().await.map_err(|e| {
            error!(error = %e, "Failed to open write connection");
            e
        })?;

        let remediated = self.remediate(&mut *writer).await;
        release(writer, "write").await;
        let outcomes = remediated.map_err(|e| {
            error!(error = %e, "Remediation sweep aborted");
            e
        })?;

        let report =
            SweepReport::from_outcomes(started_at, self.time_provider.now_millis(), outcomes);

        for record in &report.diagnostics {
            record.emit();
        }

        info!(
            scanned = report.scanned(),
            resolved = report.resolved(),
            unresolved = report.unresolved(),
            duration_ms = report.duration_ms(),
            "Remediation sweep complete"
        );

        Ok(report)
    }

    /// Scan, then terminate each instance once over `writer`
    async fn remediate(
        &self,
        writer: &mut dyn OperationsConnection,
    ) -> Result<Vec<TerminationOutcome>> {
        let instances = self.scanner.scan().await?;
        let mut outcomes = Vec::with_capacity(instances.len());

        for instance in instances {
            let completion = match writer.terminate(&instance.id).await {
                Ok(completion) => completion,
                Err(e) => {
                    // Connection-level fault on one instance is still just an outcome
                    warn!(
                        instance_id = %instance.id,
                        error = %e,
                        "Terminate command failed"
                    );
                    CompletionStatus::failed(e.to_string())
                }
            };

            debug!(
                instance_id = %instance.id,
                completion = %completion,
                "Termination attempted"
            );

            outcomes.push(TerminationOutcome::new(instance, completion));
        }

        Ok(outcomes)
    }
}

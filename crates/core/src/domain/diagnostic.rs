// Diagnostic Record - report of one instance a sweep could not terminate

use crate::domain::instance::format_epoch_millis;
use crate::domain::{CompletionStatus, InstanceId, InstanceStatus, ServiceClass, TerminationOutcome};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// tracing target for the short single-line form
pub const TRACE_TARGET: &str = "remedy::trace";

/// Structured report of one unresolved instance
///
/// `index` is the instance's 0-based position in the full discovery
/// sequence of the sweep, so gaps between records mark resolved instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub index: usize,
    pub instance_id: InstanceId,
    pub class: ServiceClass,
    pub service_type: String,
    pub created_at: i64, // epoch ms
    pub status: InstanceStatus,
    pub error_description: Option<String>,
    pub completion: CompletionStatus,
}

impl DiagnosticRecord {
    pub fn from_outcome(index: usize, outcome: &TerminationOutcome) -> Self {
        let instance = &outcome.instance;
        Self {
            index,
            instance_id: instance.id.clone(),
            class: instance.class.clone(),
            service_type: instance.service_type.clone(),
            created_at: instance.created_at,
            status: instance.status,
            error_description: instance.error_description.clone(),
            completion: outcome.completion.clone(),
        }
    }

    /// Creation time as RFC 3339 (falls back to raw epoch ms when out of range)
    pub fn creation_time(&self) -> String {
        format_epoch_millis(self.created_at)
    }

    /// Short single-line form: instance id only
    pub fn summary(&self) -> String {
        format!(
            "Could not terminate the service instance with ID {}",
            self.instance_id
        )
    }

    /// Verbose multi-line form
    pub fn detail(&self) -> String {
        format!(
            "[{:>2}] Could not terminate the service instance class: {}\n     \
             ServiceType: {}\n     \
             Creation Time: {}\n     \
             Status: {}\n     \
             Error: {}\n     \
             Outcome: {}\n",
            self.index,
            self.class,
            self.service_type,
            self.creation_time(),
            self.status,
            self.error_description.as_deref().unwrap_or(""),
            self.completion,
        )
    }

    /// Emit both WARN entries (trace line + verbose log)
    pub fn emit(&self) {
        warn!(target: TRACE_TARGET, instance_id = %self.instance_id, "{}", self.summary());
        warn!(
            index = self.index,
            instance_id = %self.instance_id,
            class = %self.class,
            service_type = %self.service_type,
            created_at = %self.creation_time(),
            status = %self.status,
            error = self.error_description.as_deref().unwrap_or(""),
            completion = %self.completion,
            "{}",
            self.detail()
        );
    }
}

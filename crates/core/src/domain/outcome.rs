// Termination Outcome Domain Model

use crate::domain::{DiagnosticRecord, ServiceInstance};
use serde::{Deserialize, Serialize};

/// Result of one termination command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Succeeded,
    /// The service refused or failed to terminate the instance
    Failed { reason: String },
    /// Already completed or terminated (typically a race with the service)
    NotApplicable,
}

impl CompletionStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        CompletionStatus::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, CompletionStatus::Succeeded)
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionStatus::Succeeded => write!(f, "SUCCEEDED"),
            CompletionStatus::Failed { reason } => write!(f, "FAILED ({})", reason),
            CompletionStatus::NotApplicable => write!(f, "NOT_APPLICABLE"),
        }
    }
}

/// One termination attempt and what the service answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationOutcome {
    pub instance: ServiceInstance,
    pub completion: CompletionStatus,
}

impl TerminationOutcome {
    pub fn new(instance: ServiceInstance, completion: CompletionStatus) -> Self {
        Self {
            instance,
            completion,
        }
    }

    /// resolved = terminated by this attempt
    pub fn is_resolved(&self) -> bool {
        self.completion.is_succeeded()
    }
}

/// Everything one sweep produced
///
/// `outcomes` holds exactly one entry per scanned instance, in discovery
/// order. `diagnostics` holds one record per unresolved outcome.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub started_at: i64,  // epoch ms
    pub finished_at: i64, // epoch ms
    pub outcomes: Vec<TerminationOutcome>,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl SweepReport {
    /// Build the report, deriving diagnostics from the outcomes
    pub fn from_outcomes(
        started_at: i64,
        finished_at: i64,
        outcomes: Vec<TerminationOutcome>,
    ) -> Self {
        let diagnostics = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| !outcome.is_resolved())
            .map(|(index, outcome)| DiagnosticRecord::from_outcome(index, outcome))
            .collect();

        Self {
            started_at,
            finished_at,
            outcomes,
            diagnostics,
        }
    }

    pub fn scanned(&self) -> usize {
        self.outcomes.len()
    }

    pub fn resolved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_resolved()).count()
    }

    pub fn unresolved(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn duration_ms(&self) -> i64 {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceStatus, ServiceClass};

    fn instance(id: &str) -> ServiceInstance {
        ServiceInstance::new(
            id,
            ServiceClass::Orchestration,
            "Billing.Process",
            InstanceStatus::Active,
            1000,
        )
    }

    #[test]
    fn test_report_indexes_over_full_sequence() {
        let outcomes = vec![
            TerminationOutcome::new(instance("a"), CompletionStatus::Succeeded),
            TerminationOutcome::new(instance("b"), CompletionStatus::Succeeded),
            TerminationOutcome::new(instance("c"), CompletionStatus::failed("locked")),
            TerminationOutcome::new(instance("d"), CompletionStatus::Succeeded),
            TerminationOutcome::new(instance("e"), CompletionStatus::NotApplicable),
        ];

        let report = SweepReport::from_outcomes(10, 25, outcomes);

        assert_eq!(report.scanned(), 5);
        assert_eq!(report.resolved(), 3);
        assert_eq!(report.unresolved(), 2);
        assert_eq!(report.duration_ms(), 15);

        let indexed: Vec<(usize, &str)> = report
            .diagnostics
            .iter()
            .map(|d| (d.index, d.instance_id.as_str()))
            .collect();
        assert_eq!(indexed, vec![(2, "c"), (4, "e")]);
    }

    #[test]
    fn test_empty_report() {
        let report = SweepReport::from_outcomes(0, 0, Vec::new());
        assert_eq!(report.scanned(), 0);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_completion_display() {
        assert_eq!(CompletionStatus::Succeeded.to_string(), "SUCCEEDED");
        assert_eq!(
            CompletionStatus::failed("row locked").to_string(),
            "FAILED (row locked)"
        );
        assert_eq!(CompletionStatus::NotApplicable.to_string(), "NOT_APPLICABLE");
    }
}

// Domain Layer - Service instances, termination outcomes, diagnostics

pub mod diagnostic;
pub mod error;
pub mod instance;
pub mod outcome;

// Re-exports
pub use diagnostic::DiagnosticRecord;
pub use error::DomainError;
pub use instance::{InstanceId, InstanceStatus, ServiceClass, ServiceInstance};
pub use outcome::{CompletionStatus, SweepReport, TerminationOutcome};

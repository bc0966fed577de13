// Port Layer - Interfaces for external dependencies

pub mod operations;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use operations::{OperationsClient, OperationsConnection};
pub use time_provider::TimeProvider;

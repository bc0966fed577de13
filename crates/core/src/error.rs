// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Only failures that prevent discovering or attempting remediation surface
/// here. A single instance that cannot be terminated is reported through
/// `CompletionStatus`, never through `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Cannot open a connection to the operations service
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Instance listing failed after the connection was opened
    #[error("Query error: {0}")]
    Query(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// True for errors that abort a scan or sweep before any termination
    pub fn is_connectivity(&self) -> bool {
        matches!(self, AppError::Connectivity(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by mapping into AppError::{Connectivity, Query, Database}

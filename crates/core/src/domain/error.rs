// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown instance status: {0}")]
    UnknownStatus(String),

    #[error("Unknown service class: {0}")]
    UnknownClass(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

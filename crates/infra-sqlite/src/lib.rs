// Remedy Infrastructure - SQLite Adapter
// Implements: OperationsClient, OperationsConnection

mod connection;
mod error;
mod migration;
mod operations;

pub use connection::{create_pool, ensure_db_dir};
pub use migration::run_migrations;
pub use operations::{SqliteConnection, SqliteOperations};

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)

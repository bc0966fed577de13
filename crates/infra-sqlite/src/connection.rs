// SQLite Connection Pool Setup

use remedy_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Read and write connections are held at once during a sweep
const MAX_CONNECTIONS: u32 = 10;

/// Create the directory that will hold the database file
///
/// `create_if_missing` creates the file but not its parent directory.
/// In-memory URLs are left alone.
pub fn ensure_db_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Config(format!("Cannot create directory {}: {}", dir.display(), e))
        }),
        _ => Ok(()),
    }
}

/// Create SQLite connection pool with WAL mode and optimizations
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("Invalid database URL {}: {}", database_url, e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|e| AppError::Connectivity(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_parent_dir_is_created() {
        let root = std::env::temp_dir().join(format!("remedy_dir_{}", uuid::Uuid::new_v4()));
        let db_path = root.join("nested").join("admin.db");
        let db_path = db_path.to_str().unwrap();

        ensure_db_dir(db_path).unwrap();
        let pool = create_pool(db_path).await.unwrap();
        assert!(pool.acquire().await.is_ok());
        pool.close().await;

        assert!(root.join("nested").is_dir());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_ensure_db_dir_ignores_memory_and_bare_names() {
        assert!(ensure_db_dir("sqlite::memory:").is_ok());
        assert!(ensure_db_dir("admin.db").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let result = create_pool("sqlite:remedy_unused.db?no_such_param=1").await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}

// sqlx::Error -> AppError mapping

use remedy_core::error::AppError;

/// SQLITE_BUSY: database is locked
pub(crate) const SQLITE_BUSY: &str = "5";

/// True when the database reported lock contention (SQLITE_BUSY or one of
/// its extended codes)
pub(crate) fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff == 5)
            .unwrap_or(false),
        _ => false,
    }
}

// Helper to convert sqlx::Error to AppError with structured information
//
// Transport-level failures (pool, I/O, TLS) become Connectivity; everything
// else is reported as a Database error.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    SQLITE_BUSY => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "14" => AppError::Connectivity(format!(
                        "Unable to open database (SQLITE_CANTOPEN): {}",
                        db_err.message()
                    )),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::Connectivity(err.to_string())
        }
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

/// Same as `map_sqlx_error`, but a failing listing is a Query error
pub(crate) fn map_query_error(err: sqlx::Error) -> AppError {
    match map_sqlx_error(err) {
        AppError::Database(message) => AppError::Query(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_connectivity() {
        assert!(map_sqlx_error(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(map_sqlx_error(sqlx::Error::PoolClosed).is_connectivity());
    }

    #[test]
    fn test_query_error_mapping() {
        let err = map_query_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Query(_)));

        let err = map_query_error(sqlx::Error::PoolClosed);
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_non_database_error_is_not_busy() {
        assert!(!is_busy(&sqlx::Error::RowNotFound));
    }
}

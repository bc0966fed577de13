// SQLite Operations Service Implementation
//
// The administrative store is a `service_instances` table. Every
// `open_connection` acquires its own pooled connection, so a sweep's read
// and write sessions never share one.

use crate::error::{is_busy, map_query_error, map_sqlx_error};
use async_trait::async_trait;
use remedy_core::domain::{
    CompletionStatus, InstanceId, InstanceStatus, ServiceClass, ServiceInstance,
};
use remedy_core::error::{AppError, Result};
use remedy_core::port::{OperationsClient, OperationsConnection, TimeProvider};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};

/// SQLite-backed operations service client
pub struct SqliteOperations {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteOperations {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Record a service instance in the store
    pub async fn register(&self, instance: &ServiceInstance) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO service_instances (
                id, class, service_type, status, created_at, error_description
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&instance.id)
        .bind(instance.class.to_string())
        .bind(&instance.service_type)
        .bind(instance.status.as_str())
        .bind(instance.created_at)
        .bind(&instance.error_description)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// Current status of one instance, if it exists
    pub async fn status_of(&self, id: &str) -> Result<Option<InstanceStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM service_instances WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        status
            .map(|s| s.parse::<InstanceStatus>().map_err(AppError::from))
            .transpose()
    }
}

#[async_trait]
impl OperationsClient for SqliteOperations {
    async fn open_connection(&self) -> Result<Box<dyn OperationsConnection>> {
        let conn = self.pool.acquire().await.map_err(|e| {
            AppError::Connectivity(format!("Failed to acquire connection: {}", e))
        })?;

        Ok(Box::new(SqliteConnection {
            conn,
            time_provider: Arc::clone(&self.time_provider),
        }))
    }
}

/// One pooled session against the administrative store
pub struct SqliteConnection {
    conn: PoolConnection<Sqlite>,
    time_provider: Arc<dyn TimeProvider>,
}

fn row_to_instance(row: &SqliteRow) -> Result<ServiceInstance> {
    let class: String = row.try_get("class").map_err(map_query_error)?;
    let status: String = row.try_get("status").map_err(map_query_error)?;

    Ok(ServiceInstance {
        id: row.try_get("id").map_err(map_query_error)?,
        class: class
            .parse::<ServiceClass>()
            .map_err(|e| AppError::Query(e.to_string()))?,
        service_type: row.try_get("service_type").map_err(map_query_error)?,
        status: status
            .parse::<InstanceStatus>()
            .map_err(|e| AppError::Query(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(map_query_error)?,
        error_description: row.try_get("error_description").map_err(map_query_error)?,
    })
}

/// `status IN (?, ?, ...)` over every actionable status
fn terminate_sql() -> String {
    let placeholders = InstanceStatus::actionable()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE service_instances SET status = ?, terminated_at = ? \
         WHERE id = ? AND status IN ({})",
        placeholders
    )
}

#[async_trait]
impl OperationsConnection for SqliteConnection {
    async fn query_instances(&mut self) -> Result<Vec<ServiceInstance>> {
        let rows = sqlx::query(
            r#"
            SELECT id, class, service_type, status, created_at, error_description
            FROM service_instances
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(map_query_error)?;

        // Undecodable rows are skipped with a warning, not fatal to the query
        let mut instances = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_instance(row) {
                Ok(instance) => instances.push(instance),
                Err(e) => {
                    let id: Option<String> = row.try_get("id").ok();
                    warn!(
                        instance_id = id.as_deref().unwrap_or("?"),
                        error = %e,
                        "Skipping unreadable service instance row"
                    );
                }
            }
        }
        Ok(instances)
    }

    async fn terminate(&mut self, id: &InstanceId) -> Result<CompletionStatus> {
        let now = self.time_provider.now_millis();
        let sql = terminate_sql();

        // Conditional update: only a still-actionable instance is terminated
        let mut query = sqlx::query(&sql)
            .bind(InstanceStatus::Terminated.as_str())
            .bind(now)
            .bind(id);
        for status in InstanceStatus::actionable() {
            query = query.bind(status.as_str());
        }

        let result = match query.execute(&mut *self.conn).await {
            Ok(result) => result,
            Err(e) if is_busy(&e) => {
                return Ok(CompletionStatus::failed(format!(
                    "instance store locked: {}",
                    e
                )));
            }
            Err(e) => return Err(map_sqlx_error(e)),
        };

        if result.rows_affected() > 0 {
            debug!(instance_id = %id, "Instance terminated");
            return Ok(CompletionStatus::Succeeded);
        }

        // Nothing updated: missing, or no longer actionable
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM service_instances WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await
                .map_err(map_sqlx_error)?;

        Ok(match current {
            None => CompletionStatus::failed("instance not found"),
            Some(status) => match status.parse::<InstanceStatus>() {
                Ok(status) if status.is_terminal() => CompletionStatus::NotApplicable,
                Ok(status) => {
                    CompletionStatus::failed(format!("instance left in status {}", status))
                }
                Err(e) => CompletionStatus::failed(e.to_string()),
            },
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        // Dropping a PoolConnection returns it to the pool
        drop(self.conn);
        Ok(())
    }
}

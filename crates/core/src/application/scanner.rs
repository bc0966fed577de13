// Instance Scanner - finds running or suspended service instances

use crate::domain::ServiceInstance;
use crate::error::Result;
use crate::port::{OperationsClient, OperationsConnection};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lists the instances a sweep should try to terminate
///
/// Every scan opens its own read connection and releases it before
/// returning, on the error path as well.
#[derive(Clone)]
pub struct InstanceScanner {
    client: Arc<dyn OperationsClient>,
}

impl InstanceScanner {
    pub fn new(client: Arc<dyn OperationsClient>) -> Self {
        Self { client }
    }

    /// Query all instances and keep the actionable ones
    ///
    /// Order is whatever the operations service returned. No partial result
    /// is produced: a connect or query failure fails the whole scan.
    pub async fn scan(&self) -> Result<Vec<ServiceInstance>> {
        let mut reader = self.client.open_connection().await?;

        let queried = reader.query_instances().await;
        let instances = match (queried, reader.close().await) {
            (Ok(instances), Ok(())) => instances,
            (Ok(_), Err(close_err)) => return Err(close_err),
            (Err(query_err), Ok(())) => return Err(query_err),
            (Err(query_err), Err(close_err)) => {
                warn!(error = %close_err, "Failed to release read connection after query error");
                return Err(query_err);
            }
        };

        let total = instances.len();
        let actionable: Vec<ServiceInstance> = instances
            .into_iter()
            .filter(ServiceInstance::is_actionable)
            .collect();

        debug!(
            total = total,
            actionable = actionable.len(),
            "Instance scan complete"
        );

        Ok(actionable)
    }
}

/// Close a connection, logging instead of failing
pub(crate) async fn release(connection: Box<dyn OperationsConnection>, role: &'static str) {
    if let Err(e) = connection.close().await {
        warn!(error = %e, role = role, "Failed to release connection");
    }
}

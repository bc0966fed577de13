//! Remediation sweep integration tests
//!
//! Runs the sweeper end-to-end against the SQLite instance store. A thin
//! instrumented client wraps `SqliteOperations` to count connections and to
//! inject refusals, races and connectivity failures.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use remedy_core::application::RemediationSweeper;
use remedy_core::domain::{
    CompletionStatus, InstanceId, InstanceStatus, ServiceClass, ServiceInstance,
};
use remedy_core::error::{AppError, Result};
use remedy_core::port::time_provider::SystemTimeProvider;
use remedy_core::port::{OperationsClient, OperationsConnection};
use remedy_infra_sqlite::{create_pool, run_migrations, SqliteOperations};
use sqlx::SqlitePool;

// ============================================================================
// Fixtures
// ============================================================================

struct Store {
    path: PathBuf,
    pool: SqlitePool,
    ops: Arc<SqliteOperations>,
}

impl Store {
    async fn new() -> Self {
        let path =
            std::env::temp_dir().join(format!("remedy_it_{}.db", uuid::Uuid::new_v4()));
        let pool = create_pool(path.to_str().unwrap()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let ops = Arc::new(SqliteOperations::new(
            pool.clone(),
            Arc::new(SystemTimeProvider),
        ));
        Self { path, pool, ops }
    }

    async fn seed(&self, instances: &[ServiceInstance]) {
        for instance in instances {
            self.ops.register(instance).await.unwrap();
        }
    }

    async fn status(&self, id: &str) -> InstanceStatus {
        self.ops.status_of(id).await.unwrap().unwrap()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

fn instance(id: &str, status: InstanceStatus, created_at: i64) -> ServiceInstance {
    ServiceInstance::new(
        id,
        ServiceClass::Orchestration,
        "Orders.Fulfilment",
        status,
        created_at,
    )
}

#[derive(Default)]
struct Faults {
    /// Open call number (1-based) that fails with a connectivity error
    fail_open: Option<usize>,
    /// Instances the service refuses to terminate
    refuse: HashSet<String>,
    /// Instances that complete on their own just before termination
    race: HashSet<String>,
}

struct InstrumentedOperations {
    inner: Arc<SqliteOperations>,
    pool: SqlitePool,
    faults: Arc<Faults>,
    opens: AtomicUsize,
    terminations: Arc<AtomicUsize>,
}

impl InstrumentedOperations {
    fn new(store: &Store, faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::clone(&store.ops),
            pool: store.pool.clone(),
            faults: Arc::new(faults),
            opens: AtomicUsize::new(0),
            terminations: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationsClient for InstrumentedOperations {
    async fn open_connection(&self) -> Result<Box<dyn OperationsConnection>> {
        let number = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.fail_open == Some(number) {
            return Err(AppError::Connectivity(format!(
                "connection {} refused",
                number
            )));
        }
        Ok(Box::new(InstrumentedConnection {
            inner: self.inner.open_connection().await?,
            pool: self.pool.clone(),
            faults: Arc::clone(&self.faults),
            terminations: Arc::clone(&self.terminations),
        }))
    }
}

struct InstrumentedConnection {
    inner: Box<dyn OperationsConnection>,
    pool: SqlitePool,
    faults: Arc<Faults>,
    terminations: Arc<AtomicUsize>,
}

#[async_trait]
impl OperationsConnection for InstrumentedConnection {
    async fn query_instances(&mut self) -> Result<Vec<ServiceInstance>> {
        self.inner.query_instances().await
    }

    async fn terminate(&mut self, id: &InstanceId) -> Result<CompletionStatus> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if self.faults.refuse.contains(id) {
            return Ok(CompletionStatus::failed("refused by service"));
        }
        if self.faults.race.contains(id) {
            sqlx::query("UPDATE service_instances SET status = 'COMPLETED' WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .unwrap();
        }
        self.inner.terminate(id).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.close().await
    }
}

fn sweeper(client: Arc<InstrumentedOperations>) -> RemediationSweeper {
    RemediationSweeper::new(client, Arc::new(SystemTimeProvider))
}

// ============================================================================
// Scenarios
// ============================================================================

/// Scenario A: terminal instances are never targeted
#[tokio::test]
async fn test_only_running_or_suspended_instances_are_terminated() {
    let store = Store::new().await;
    store
        .seed(&[
            instance("i1", InstanceStatus::Active, 1000),
            instance("i2", InstanceStatus::SuspendedResumable, 2000),
            instance("i3", InstanceStatus::Completed, 3000),
        ])
        .await;
    let client = InstrumentedOperations::new(&store, Faults::default());

    let report = sweeper(client.clone()).sweep_report().await.unwrap();

    assert_eq!(client.terminations(), 2);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(store.status("i1").await, InstanceStatus::Terminated);
    assert_eq!(store.status("i2").await, InstanceStatus::Terminated);
    assert_eq!(store.status("i3").await, InstanceStatus::Completed);
}

/// Scenario B: every termination succeeds
#[tokio::test]
async fn test_all_succeeded_yields_no_diagnostics() {
    let store = Store::new().await;
    store
        .seed(&[
            instance("a", InstanceStatus::ReadyToRun, 1000),
            instance("b", InstanceStatus::Dehydrated, 2000),
            instance("c", InstanceStatus::InBreakpoint, 3000),
        ])
        .await;
    let client = InstrumentedOperations::new(&store, Faults::default());

    let diagnostics = sweeper(client.clone()).sweep().await.unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(client.terminations(), 3);
}

/// Scenario C: one failure, reported with its discovery index
#[tokio::test]
async fn test_failed_termination_reported_with_discovery_index() {
    let store = Store::new().await;
    store
        .seed(&[
            instance("i1", InstanceStatus::Active, 1000),
            instance("i2", InstanceStatus::SuspendedNotResumable, 2000)
                .with_error("Uncaught exception in shape 'Send'"),
        ])
        .await;
    let client = InstrumentedOperations::new(
        &store,
        Faults {
            refuse: HashSet::from(["i2".to_string()]),
            ..Default::default()
        },
    );

    let diagnostics = sweeper(client).sweep().await.unwrap();

    assert_eq!(diagnostics.len(), 1);
    let record = &diagnostics[0];
    assert_eq!(record.index, 1);
    assert_eq!(record.instance_id, "i2");
    assert_eq!(record.status, InstanceStatus::SuspendedNotResumable);
    assert_eq!(
        record.error_description.as_deref(),
        Some("Uncaught exception in shape 'Send'")
    );
    assert!(record.detail().starts_with("[ 1] "));
    assert_eq!(store.status("i1").await, InstanceStatus::Terminated);
    assert_eq!(store.status("i2").await, InstanceStatus::SuspendedNotResumable);
}

/// Scenario D: the scanner cannot connect
#[tokio::test]
async fn test_scan_connectivity_failure_aborts_sweep() {
    let store = Store::new().await;
    store
        .seed(&[instance("i1", InstanceStatus::Active, 1000)])
        .await;
    // open #1 is the sweep's write connection, open #2 the scanner's
    let client = InstrumentedOperations::new(
        &store,
        Faults {
            fail_open: Some(2),
            ..Default::default()
        },
    );

    let err = sweeper(client.clone()).sweep().await.unwrap_err();

    assert!(err.is_connectivity());
    assert_eq!(client.terminations(), 0);
    assert_eq!(store.status("i1").await, InstanceStatus::Active);
}

/// Scenario D (variant): the write connection cannot be opened
#[tokio::test]
async fn test_write_connection_failure_aborts_before_scan() {
    let store = Store::new().await;
    store
        .seed(&[instance("i1", InstanceStatus::Active, 1000)])
        .await;
    let client = InstrumentedOperations::new(
        &store,
        Faults {
            fail_open: Some(1),
            ..Default::default()
        },
    );

    let err = sweeper(client.clone()).sweep().await.unwrap_err();

    assert!(err.is_connectivity());
    assert_eq!(client.opens(), 1);
    assert_eq!(client.terminations(), 0);
}

/// Scenario E: nothing to do is still a successful sweep
#[tokio::test]
async fn test_empty_store_sweep_succeeds() {
    let store = Store::new().await;
    let client = InstrumentedOperations::new(&store, Faults::default());

    let diagnostics = sweeper(client.clone()).sweep().await.unwrap();

    assert!(diagnostics.is_empty());
    assert_eq!(client.opens(), 2);
    assert_eq!(client.terminations(), 0);
}

// ============================================================================
// Properties
// ============================================================================

/// An instance completing between scan and terminate is reported, not raised
#[tokio::test]
async fn test_race_with_service_reported_as_not_applicable() {
    let store = Store::new().await;
    store
        .seed(&[
            instance("steady", InstanceStatus::Active, 1000),
            instance("racer", InstanceStatus::Active, 2000),
        ])
        .await;
    let client = InstrumentedOperations::new(
        &store,
        Faults {
            race: HashSet::from(["racer".to_string()]),
            ..Default::default()
        },
    );

    let diagnostics = sweeper(client).sweep().await.unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].instance_id, "racer");
    assert_eq!(diagnostics[0].completion, CompletionStatus::NotApplicable);
    assert_eq!(store.status("racer").await, InstanceStatus::Completed);
}

/// Re-sweeping re-attempts only what is still actionable
#[tokio::test]
async fn test_repeated_sweep_reattempts_unresolved_only() {
    let store = Store::new().await;
    store
        .seed(&[
            instance("ok", InstanceStatus::Active, 1000),
            instance("stuck", InstanceStatus::SuspendedResumable, 2000),
        ])
        .await;
    let client = InstrumentedOperations::new(
        &store,
        Faults {
            refuse: HashSet::from(["stuck".to_string()]),
            ..Default::default()
        },
    );
    let sweeper = sweeper(client.clone());

    let first = sweeper.sweep().await.unwrap();
    let second = sweeper.sweep().await.unwrap();

    assert_eq!(client.terminations(), 3);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].instance_id, second[0].instance_id);
    assert_eq!(first[0].completion, second[0].completion);
    assert_eq!(second[0].index, 0);
}

/// Outcome count always equals the number of scanned instances
#[tokio::test]
async fn test_outcome_count_matches_scan() {
    let store = Store::new().await;
    let statuses = [
        InstanceStatus::ReadyToRun,
        InstanceStatus::Completed,
        InstanceStatus::Active,
        InstanceStatus::Terminated,
        InstanceStatus::SuspendedResumable,
        InstanceStatus::Dehydrated,
    ];
    let seeded: Vec<ServiceInstance> = statuses
        .iter()
        .enumerate()
        .map(|(n, status)| instance(&format!("i{}", n), *status, 1000 + n as i64))
        .collect();
    store.seed(&seeded).await;
    let client = InstrumentedOperations::new(
        &store,
        Faults {
            refuse: HashSet::from(["i2".to_string(), "i5".to_string()]),
            ..Default::default()
        },
    );
    let sweeper = sweeper(client.clone());

    let scanned = sweeper.scanner().scan().await.unwrap();
    let report = sweeper.sweep_report().await.unwrap();

    assert_eq!(scanned.len(), 4);
    assert_eq!(report.outcomes.len(), scanned.len());
    assert_eq!(client.terminations(), scanned.len());
    // discovery order: i0, i2, i4, i5
    let indices: Vec<usize> = report.diagnostics.iter().map(|d| d.index).collect();
    assert_eq!(indices, vec![1, 3]);
}

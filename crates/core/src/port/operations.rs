// Operations Service Port (Interface)
//
// The operations service takes a write lock on its command path that its
// query path does not take. Sharing one connection across a query and the
// terminations that follow it produces lock contention errors, so callers
// keep separate read and write connections.

use crate::domain::{CompletionStatus, InstanceId, ServiceInstance};
use crate::error::Result;
use async_trait::async_trait;

/// Factory for connections to the operations service
#[async_trait]
pub trait OperationsClient: Send + Sync {
    /// Open a new, independent connection
    ///
    /// # Errors
    /// - `AppError::Connectivity` if the service cannot be reached
    async fn open_connection(&self) -> Result<Box<dyn OperationsConnection>>;
}

/// One session with the operations service
///
/// Dropping a connection releases it; `close` releases it explicitly and
/// surfaces any error from doing so.
#[async_trait]
pub trait OperationsConnection: Send {
    /// Full snapshot of tracked instances (no status filtering)
    ///
    /// # Errors
    /// - `AppError::Query` if the listing fails
    async fn query_instances(&mut self) -> Result<Vec<ServiceInstance>>;

    /// Terminate one instance
    ///
    /// Ordinary remediation failures come back as a non-succeeded
    /// `CompletionStatus`; `Err` is reserved for connection-level faults.
    async fn terminate(&mut self, id: &InstanceId) -> Result<CompletionStatus>;

    /// Release the connection
    async fn close(self: Box<Self>) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::InstanceStatus;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockState {
        instances: Vec<ServiceInstance>,
        scripted: HashMap<InstanceId, CompletionStatus>,
        faulted: HashSet<InstanceId>,
        fail_open: bool,
        fail_query: bool,
        opened: usize,
        closed: usize,
        queried_on: Vec<usize>,
        terminated: Vec<(usize, InstanceId)>,
    }

    /// In-memory operations service
    ///
    /// Terminations succeed unless scripted otherwise. A succeeded
    /// termination flips the stored instance to `Terminated`, so a second
    /// sweep sees it as terminal.
    #[derive(Clone, Default)]
    pub struct MockOperationsClient {
        state: Arc<Mutex<MockState>>,
    }

    impl MockOperationsClient {
        pub fn new(instances: Vec<ServiceInstance>) -> Self {
            let client = Self::default();
            client.state.lock().unwrap().instances = instances;
            client
        }

        /// Script the answer for one instance
        pub fn with_completion(self, id: &str, completion: CompletionStatus) -> Self {
            self.state
                .lock()
                .unwrap()
                .scripted
                .insert(id.to_string(), completion);
            self
        }

        /// Make `terminate` return a connection-level error for one instance
        pub fn with_fault(self, id: &str) -> Self {
            self.state.lock().unwrap().faulted.insert(id.to_string());
            self
        }

        pub fn fail_open(self) -> Self {
            self.state.lock().unwrap().fail_open = true;
            self
        }

        pub fn fail_query(self) -> Self {
            self.state.lock().unwrap().fail_query = true;
            self
        }

        pub fn opened(&self) -> usize {
            self.state.lock().unwrap().opened
        }

        pub fn closed(&self) -> usize {
            self.state.lock().unwrap().closed
        }

        /// Connection numbers that issued a query
        pub fn queried_on(&self) -> Vec<usize> {
            self.state.lock().unwrap().queried_on.clone()
        }

        /// (connection number, instance id) for every terminate call
        pub fn terminate_calls(&self) -> Vec<(usize, InstanceId)> {
            self.state.lock().unwrap().terminated.clone()
        }

        pub fn terminated_ids(&self) -> Vec<InstanceId> {
            self.terminate_calls()
                .into_iter()
                .map(|(_, id)| id)
                .collect()
        }
    }

    #[async_trait]
    impl OperationsClient for MockOperationsClient {
        async fn open_connection(&self) -> Result<Box<dyn OperationsConnection>> {
            let mut state = self.state.lock().unwrap();
            if state.fail_open {
                return Err(AppError::Connectivity(
                    "operations service unreachable".to_string(),
                ));
            }
            state.opened += 1;
            Ok(Box::new(MockConnection {
                number: state.opened,
                state: Arc::clone(&self.state),
            }))
        }
    }

    struct MockConnection {
        number: usize,
        state: Arc<Mutex<MockState>>,
    }

    #[async_trait]
    impl OperationsConnection for MockConnection {
        async fn query_instances(&mut self) -> Result<Vec<ServiceInstance>> {
            let mut state = self.state.lock().unwrap();
            state.queried_on.push(self.number);
            if state.fail_query {
                return Err(AppError::Connectivity(
                    "connection reset during instance query".to_string(),
                ));
            }
            Ok(state.instances.clone())
        }

        async fn terminate(&mut self, id: &InstanceId) -> Result<CompletionStatus> {
            let mut state = self.state.lock().unwrap();
            state.terminated.push((self.number, id.clone()));

            if state.faulted.contains(id) {
                return Err(AppError::Connectivity(format!(
                    "connection dropped while terminating {}",
                    id
                )));
            }

            let completion = match state.scripted.get(id) {
                Some(scripted) => scripted.clone(),
                None => match state.instances.iter().find(|i| &i.id == id) {
                    Some(instance) if instance.status.is_terminal() => {
                        CompletionStatus::NotApplicable
                    }
                    Some(_) => CompletionStatus::Succeeded,
                    None => CompletionStatus::failed("instance not found"),
                },
            };

            if completion.is_succeeded() {
                if let Some(instance) = state.instances.iter_mut().find(|i| &i.id == id) {
                    instance.status = InstanceStatus::Terminated;
                }
            }
            Ok(completion)
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.state.lock().unwrap().closed += 1;
            Ok(())
        }
    }
}

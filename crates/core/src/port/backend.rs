// Infrastructure Backend Ports
// Execution backend (runs, sessions), image registry, job scheduler

use crate::domain::SessionKey;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by infrastructure backends
///
/// `NotFound` means the target is already gone. Callers performing teardown
/// treat it as success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Target not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend call timed out after {0}ms")]
    Timeout(u64),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

/// Container/session orchestration backend
///
/// Both calls must be safe on an already-stopped target.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Terminate the workload of a pipeline run
    async fn abort_run(&self, run_uuid: &str) -> Result<(), BackendError>;

    /// Tear down the live compute context of an interactive session
    async fn stop_session(&self, key: &SessionKey) -> Result<(), BackendError>;
}

/// Image registry / build backend
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Delete every image artifact built for the project (no-op when none exist)
    async fn delete_project_images(&self, project_uuid: &str) -> Result<(), BackendError>;
}

/// Job scheduler
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Cancel outstanding scheduled invocations of a job
    async fn cancel_job(&self, job_uuid: &str) -> Result<(), BackendError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Ordered log shared between fakes (e.g. store commits and backend calls)
    pub type EventLog = Arc<Mutex<Vec<String>>>;

    pub fn event_log() -> EventLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Recording backend implementing all three infrastructure ports
    ///
    /// Every call is appended to the event log as `<call>:<target>`, e.g.
    /// `abort_run:r1`. Failures can be injected per call.
    pub struct RecordingBackend {
        events: EventLog,
        failures: Mutex<HashMap<String, BackendError>>,
        delay: Mutex<Option<std::time::Duration>>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            Self::with_log(event_log())
        }

        pub fn with_log(events: EventLog) -> Self {
            Self {
                events,
                failures: Mutex::new(HashMap::new()),
                delay: Mutex::new(None),
            }
        }

        /// Make the given call (`<call>:<target>`) fail with `err`
        pub fn fail_call(&self, call: impl Into<String>, err: BackendError) {
            self.failures.lock().unwrap().insert(call.into(), err);
        }

        /// Remove all injected failures
        pub fn heal(&self) {
            self.failures.lock().unwrap().clear();
        }

        /// Sleep before answering each call
        pub fn set_delay(&self, delay: std::time::Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        /// Backend calls recorded so far (store events filtered out)
        pub fn calls(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| {
                    e.starts_with("abort_run:")
                        || e.starts_with("stop_session:")
                        || e.starts_with("cancel_job:")
                        || e.starts_with("delete_images:")
                })
                .cloned()
                .collect()
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        async fn record(&self, call: String) -> Result<(), BackendError> {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.events.lock().unwrap().push(call.clone());
            match self.failures.lock().unwrap().get(&call) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    impl Default for RecordingBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ExecutionBackend for RecordingBackend {
        async fn abort_run(&self, run_uuid: &str) -> Result<(), BackendError> {
            self.record(format!("abort_run:{}", run_uuid)).await
        }

        async fn stop_session(&self, key: &SessionKey) -> Result<(), BackendError> {
            self.record(format!("stop_session:{}", key)).await
        }
    }

    #[async_trait]
    impl ImageRegistry for RecordingBackend {
        async fn delete_project_images(&self, project_uuid: &str) -> Result<(), BackendError> {
            self.record(format!("delete_images:{}", project_uuid)).await
        }
    }

    #[async_trait]
    impl JobScheduler for RecordingBackend {
        async fn cancel_job(&self, job_uuid: &str) -> Result<(), BackendError> {
            self.record(format!("cancel_job:{}", job_uuid)).await
        }
    }
}

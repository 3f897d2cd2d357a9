// Collateral Queue & Executor
// Post-commit side effects: ordered, best-effort, never rolled back

use crate::domain::{CollateralAction, SessionKey};
use crate::error::AppError;
use crate::port::{
    BackendError, CollateralLedger, ExecutionBackend, IdProvider, ImageRegistry, JobScheduler,
    NewLedgerEntry, TimeProvider,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_COLLATERAL_TIMEOUT_MS;

/// What happens to a collateral action that fails after commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollateralPolicy {
    /// Log the failure and return it in the report
    #[default]
    FireAndLog,
    /// Additionally persist the failure in the collateral ledger for retry
    RetryQueue,
}

impl std::fmt::Display for CollateralPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollateralPolicy::FireAndLog => write!(f, "fire-and-log"),
            CollateralPolicy::RetryQueue => write!(f, "retry-queue"),
        }
    }
}

impl std::str::FromStr for CollateralPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fire-and-log" | "fire_and_log" => Ok(CollateralPolicy::FireAndLog),
            "retry-queue" | "retry_queue" => Ok(CollateralPolicy::RetryQueue),
            other => Err(AppError::Config(format!(
                "Unknown collateral policy '{}' (expected fire-and-log or retry-queue)",
                other
            ))),
        }
    }
}

/// Queue entry: the action plus the unit that queued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCollateral {
    pub unit: &'static str,
    pub action: CollateralAction,
}

/// Ordered list of pending post-commit actions
#[derive(Debug, Default)]
pub struct CollateralQueue {
    entries: Vec<QueuedCollateral>,
}

impl CollateralQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: &'static str, action: CollateralAction) {
        self.entries.push(QueuedCollateral { unit, action });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<QueuedCollateral> {
        self.entries
    }
}

/// Successful result of one collateral action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// Backend reported the target as already gone
    AlreadyGone,
}

/// A post-commit action that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollateralFailure {
    pub unit: String,
    pub action: CollateralAction,
    pub error: String,
    /// Ledger entry id when the failure was queued for retry
    pub ledger_id: Option<String>,
}

/// Outcome of draining a collateral queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollateralReport {
    pub executed: usize,
    pub already_gone: usize,
    pub failures: Vec<CollateralFailure>,
}

impl CollateralReport {
    pub fn succeeded(&self) -> usize {
        self.executed - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct RetryQueue {
    ledger: Arc<dyn CollateralLedger>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

/// Executes collateral actions against the infrastructure backends
pub struct CollateralExecutor {
    execution: Arc<dyn ExecutionBackend>,
    registry: Arc<dyn ImageRegistry>,
    scheduler: Arc<dyn JobScheduler>,
    timeout: Duration,
    retry_queue: Option<RetryQueue>,
}

impl CollateralExecutor {
    pub fn new(
        execution: Arc<dyn ExecutionBackend>,
        registry: Arc<dyn ImageRegistry>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            execution,
            registry,
            scheduler,
            timeout: Duration::from_millis(DEFAULT_COLLATERAL_TIMEOUT_MS),
            retry_queue: None,
        }
    }

    /// Bound every backend call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Switch to `CollateralPolicy::RetryQueue`
    pub fn with_retry_queue(
        mut self,
        ledger: Arc<dyn CollateralLedger>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        self.retry_queue = Some(RetryQueue {
            ledger,
            id_provider,
            time_provider,
        });
        self
    }

    pub fn policy(&self) -> CollateralPolicy {
        if self.retry_queue.is_some() {
            CollateralPolicy::RetryQueue
        } else {
            CollateralPolicy::FireAndLog
        }
    }

    /// Execute a single action; "not found" counts as success
    pub async fn execute(&self, action: &CollateralAction) -> Result<ActionOutcome, BackendError> {
        let call = async {
            match action {
                CollateralAction::AbortRun { run_uuid } => {
                    self.execution.abort_run(run_uuid).await
                }
                CollateralAction::StopSession {
                    project_uuid,
                    pipeline_uuid,
                } => {
                    let key = SessionKey::new(project_uuid.as_str(), pipeline_uuid.as_str());
                    self.execution.stop_session(&key).await
                }
                CollateralAction::CancelJob { job_uuid } => {
                    self.scheduler.cancel_job(job_uuid).await
                }
                CollateralAction::DeleteImages { project_uuid } => {
                    self.registry.delete_project_images(project_uuid).await
                }
            }
        };

        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(BackendError::Timeout(self.timeout.as_millis() as u64)),
            Ok(Ok(())) => Ok(ActionOutcome::Done),
            Ok(Err(e)) if e.is_not_found() => Ok(ActionOutcome::AlreadyGone),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Run every queued action in enqueue order
    ///
    /// A failing action never stops the drain.
    pub async fn drain(&self, queue: CollateralQueue) -> CollateralReport {
        let mut report = CollateralReport::default();

        for entry in queue.into_entries() {
            report.executed += 1;

            match self.execute(&entry.action).await {
                Ok(ActionOutcome::Done) => {
                    debug!(
                        unit = entry.unit,
                        action = %entry.action,
                        "Collateral action completed"
                    );
                }
                Ok(ActionOutcome::AlreadyGone) => {
                    report.already_gone += 1;
                    info!(
                        unit = entry.unit,
                        action = %entry.action,
                        "Collateral target already gone"
                    );
                }
                Err(e) => {
                    warn!(
                        unit = entry.unit,
                        action = %entry.action,
                        error = %e,
                        policy = %self.policy(),
                        "Collateral action failed after commit"
                    );
                    let ledger_id = self.persist_failure(&entry, &e).await;
                    report.failures.push(CollateralFailure {
                        unit: entry.unit.to_string(),
                        action: entry.action,
                        error: e.to_string(),
                        ledger_id,
                    });
                }
            }
        }

        report
    }

    async fn persist_failure(
        &self,
        entry: &QueuedCollateral,
        err: &BackendError,
    ) -> Option<String> {
        let retry_queue = self.retry_queue.as_ref()?;

        let record = NewLedgerEntry {
            id: retry_queue.id_provider.generate_id(),
            unit: entry.unit.to_string(),
            action: entry.action.clone(),
            error: err.to_string(),
            created_at: retry_queue.time_provider.now_millis(),
        };

        match retry_queue.ledger.record(&record).await {
            Ok(()) => Some(record.id),
            Err(ledger_err) => {
                error!(
                    action = %entry.action,
                    error = %ledger_err,
                    "Failed to persist collateral failure"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::backend::mocks::RecordingBackend;
    use crate::port::collateral_ledger::mocks::InMemoryLedger;
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::time_provider::FixedTimeProvider;
    use crate::port::LedgerStatus;

    fn executor(backend: &Arc<RecordingBackend>) -> CollateralExecutor {
        CollateralExecutor::new(backend.clone(), backend.clone(), backend.clone())
    }

    fn abort(run: &str) -> CollateralAction {
        CollateralAction::AbortRun {
            run_uuid: run.to_string(),
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "retry-queue".parse::<CollateralPolicy>().unwrap(),
            CollateralPolicy::RetryQueue
        );
        assert_eq!(
            "Fire-And-Log".parse::<CollateralPolicy>().unwrap(),
            CollateralPolicy::FireAndLog
        );
        assert!("drop".parse::<CollateralPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_drain_runs_in_enqueue_order() {
        let backend = Arc::new(RecordingBackend::new());
        let mut queue = CollateralQueue::new();
        queue.push("abort_run", abort("r2"));
        queue.push(
            "delete_environment_images",
            CollateralAction::DeleteImages {
                project_uuid: "p1".to_string(),
            },
        );
        queue.push("abort_run", abort("r1"));

        let report = executor(&backend).drain(queue).await;

        assert_eq!(
            backend.calls(),
            vec!["abort_run:r2", "delete_images:p1", "abort_run:r1"]
        );
        assert_eq!(report.executed, 3);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_not_found_is_success() {
        let backend = Arc::new(RecordingBackend::new());
        backend.fail_call("abort_run:r1", BackendError::NotFound("r1".to_string()));

        let outcome = executor(&backend).execute(&abort("r1")).await.unwrap();
        assert_eq!(outcome, ActionOutcome::AlreadyGone);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_drain() {
        let backend = Arc::new(RecordingBackend::new());
        backend.fail_call(
            "abort_run:r1",
            BackendError::Unavailable("connection refused".to_string()),
        );
        let mut queue = CollateralQueue::new();
        queue.push("abort_run", abort("r1"));
        queue.push("abort_run", abort("r2"));

        let report = executor(&backend).drain(queue).await;

        assert_eq!(backend.calls(), vec!["abort_run:r1", "abort_run:r2"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].action, abort("r1"));
        assert_eq!(report.failures[0].ledger_id, None);
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let backend = Arc::new(RecordingBackend::new());
        backend.set_delay(Duration::from_millis(200));
        let executor = executor(&backend).with_timeout(Duration::from_millis(10));

        let err = executor.execute(&abort("r1")).await.unwrap_err();
        assert_eq!(err, BackendError::Timeout(10));
    }

    #[tokio::test]
    async fn test_retry_queue_persists_failures() {
        let backend = Arc::new(RecordingBackend::new());
        backend.fail_call(
            "cancel_job:j1",
            BackendError::Rejected {
                status: 500,
                message: "boom".to_string(),
            },
        );
        let ledger = Arc::new(InMemoryLedger::new());
        let executor = executor(&backend).with_retry_queue(
            ledger.clone(),
            Arc::new(SequentialIdProvider::new("cf")),
            Arc::new(FixedTimeProvider(1_000)),
        );
        assert_eq!(executor.policy(), CollateralPolicy::RetryQueue);

        let mut queue = CollateralQueue::new();
        queue.push(
            "delete_job",
            CollateralAction::CancelJob {
                job_uuid: "j1".to_string(),
            },
        );
        let report = executor.drain(queue).await;

        assert_eq!(report.failures[0].ledger_id.as_deref(), Some("cf-1"));
        let entries = ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].unit, "delete_job");
        assert_eq!(entries[0].status, LedgerStatus::Pending);
        assert_eq!(entries[0].created_at, 1_000);
    }

    #[tokio::test]
    async fn test_ledger_error_is_not_fatal() {
        let backend = Arc::new(RecordingBackend::new());
        backend.fail_call("abort_run:r1", BackendError::Timeout(5));
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.fail_writes();
        let executor = executor(&backend).with_retry_queue(
            ledger,
            Arc::new(SequentialIdProvider::new("cf")),
            Arc::new(FixedTimeProvider(1_000)),
        );

        let mut queue = CollateralQueue::new();
        queue.push("abort_run", abort("r1"));
        let report = executor.drain(queue).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].ledger_id, None);
    }
}

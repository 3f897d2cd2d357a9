// Transaction Scope & Coordinator
// One metadata transaction + its collateral queue

use crate::application::collateral::{CollateralExecutor, CollateralQueue, CollateralReport};
use crate::application::unit::UnitOfWork;
use crate::error::Result;
use crate::port::{MetadataStore, MetadataTransaction, TimeProvider};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Handle shared by every unit of work running in one transaction
///
/// Created by `open`, consumed by `close`. Dropping a scope without closing it
/// drops the underlying transaction (which rolls back) and the queue.
pub struct TransactionScope {
    tx: Box<dyn MetadataTransaction>,
    queue: CollateralQueue,
    time_provider: Arc<dyn TimeProvider>,
}

impl TransactionScope {
    /// Begin a store transaction with an empty collateral queue
    pub async fn open(
        store: &dyn MetadataStore,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        let tx = store.begin_transaction().await?;
        debug!("Transaction scope opened");
        Ok(Self {
            tx,
            queue: CollateralQueue::new(),
            time_provider,
        })
    }

    /// Metadata operations bound to the ambient transaction
    pub fn store(&mut self) -> &mut dyn MetadataTransaction {
        &mut *self.tx
    }

    pub fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    /// Collateral actions queued so far
    pub fn queue(&self) -> &CollateralQueue {
        &self.queue
    }

    /// Run a unit's store phase now and queue its side-effect phase
    pub async fn run<U: UnitOfWork + ?Sized>(&mut self, unit: &U) -> Result<()> {
        debug!(unit = unit.name(), "Running store phase");

        if let Some(action) = unit.transaction(self).await? {
            debug!(unit = unit.name(), action = %action, "Queued collateral action");
            self.queue.push(unit.name(), action);
        }

        Ok(())
    }

    /// Finish the scope
    ///
    /// On `Ok`, commits and then drains the queue in enqueue order. On `Err`,
    /// rolls back, discards the queue and returns the original error.
    pub async fn close(
        self,
        outcome: Result<()>,
        collateral: &CollateralExecutor,
    ) -> Result<CollateralReport> {
        let TransactionScope { tx, queue, .. } = self;

        if let Err(err) = outcome {
            warn!(
                error = %err,
                discarded_actions = queue.len(),
                "Store phase failed, rolling back scope"
            );
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            return Err(err);
        }

        tx.commit().await?;
        info!(queued_actions = queue.len(), "Scope committed");

        let report = collateral.drain(queue).await;
        if !report.is_clean() {
            warn!(
                failed = report.failures.len(),
                executed = report.executed,
                "Collateral completed with failures"
            );
        }
        Ok(report)
    }
}

/// Runs top-level units of work, one scope each
pub struct Coordinator {
    store: Arc<dyn MetadataStore>,
    collateral: Arc<CollateralExecutor>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        collateral: Arc<CollateralExecutor>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            collateral,
            time_provider,
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    pub fn collateral(&self) -> &Arc<CollateralExecutor> {
        &self.collateral
    }

    /// Open a scope, run `unit` in it and close it
    pub async fn execute<U: UnitOfWork + ?Sized>(&self, unit: &U) -> Result<CollateralReport> {
        let mut scope =
            TransactionScope::open(self.store.as_ref(), Arc::clone(&self.time_provider)).await?;
        let outcome = scope.run(unit).await;
        scope.close(outcome, &self.collateral).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Harness;
    use crate::domain::CollateralAction;
    use crate::error::AppError;
    use async_trait::async_trait;

    /// Queues a fixed action, optionally failing after a nested unit ran
    struct Probe {
        action: Option<CollateralAction>,
        child: Option<Box<Probe>>,
        fail: bool,
    }

    impl Probe {
        fn abort(run: &str) -> Self {
            Self {
                action: Some(CollateralAction::AbortRun {
                    run_uuid: run.to_string(),
                }),
                child: None,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl UnitOfWork for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        async fn transaction(
            &self,
            scope: &mut TransactionScope,
        ) -> Result<Option<CollateralAction>> {
            scope.store().project_exists("p1").await?;
            if let Some(child) = &self.child {
                scope.run(child.as_ref()).await?;
            }
            if self.fail {
                return Err(AppError::Database("constraint failed".to_string()));
            }
            Ok(self.action.clone())
        }
    }

    #[tokio::test]
    async fn test_collateral_runs_after_commit() {
        let h = Harness::new();
        let unit = Probe {
            child: Some(Box::new(Probe::abort("child"))),
            ..Probe::abort("parent")
        };

        let report = h.coordinator.execute(&unit).await.unwrap();

        assert_eq!(
            h.backend.events(),
            vec!["begin", "commit", "abort_run:child", "abort_run:parent"]
        );
        assert_eq!(report.executed, 2);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_discards_queue() {
        let h = Harness::new();
        let unit = Probe {
            child: Some(Box::new(Probe::abort("child"))),
            fail: true,
            ..Probe::abort("parent")
        };

        let err = h.coordinator.execute(&unit).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(h.backend.events(), vec!["begin", "rollback"]);
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_nested_failure_propagates() {
        let h = Harness::new();
        let unit = Probe {
            child: Some(Box::new(Probe {
                fail: true,
                ..Probe::abort("child")
            })),
            ..Probe::abort("parent")
        };

        assert!(h.coordinator.execute(&unit).await.is_err());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unit_without_collateral_queues_nothing() {
        let h = Harness::new();
        let unit = Probe {
            action: None,
            child: None,
            fail: false,
        };

        let report = h.coordinator.execute(&unit).await.unwrap();
        assert_eq!(report.executed, 0);
        assert_eq!(h.backend.events(), vec!["begin", "commit"]);
    }

    #[tokio::test]
    async fn test_manual_scope_composes_units() {
        let h = Harness::new();
        let mut scope = TransactionScope::open(h.store.as_ref(), h.time_provider())
            .await
            .unwrap();

        scope.run(&Probe::abort("a")).await.unwrap();
        scope.run(&Probe::abort("b")).await.unwrap();
        assert_eq!(scope.queue().len(), 2);
        assert!(h.backend.calls().is_empty());

        let report = scope.close(Ok(()), h.coordinator.collateral()).await.unwrap();
        assert_eq!(report.executed, 2);
        assert_eq!(h.backend.calls(), vec!["abort_run:a", "abort_run:b"]);
    }
}

// Abort-Run: mark a live run ABORTED, then terminate its workload

use crate::application::scope::TransactionScope;
use crate::application::unit::UnitOfWork;
use crate::domain::{CollateralAction, RunId};
use crate::error::Result;
use async_trait::async_trait;
use tracing::{debug, info};

pub struct AbortRun {
    run_uuid: RunId,
}

impl AbortRun {
    pub fn new(run_uuid: impl Into<String>) -> Self {
        Self {
            run_uuid: run_uuid.into(),
        }
    }
}

#[async_trait]
impl UnitOfWork for AbortRun {
    fn name(&self) -> &'static str {
        "abort_run"
    }

    async fn transaction(&self, scope: &mut TransactionScope) -> Result<Option<CollateralAction>> {
        let now = scope.now_millis();

        let Some(mut run) = scope.store().find_run(&self.run_uuid).await? else {
            debug!(run_uuid = %self.run_uuid, "Run not found, nothing to abort");
            return Ok(None);
        };

        if !run.status.is_live() {
            debug!(
                run_uuid = %self.run_uuid,
                status = %run.status,
                "Run already finished, nothing to abort"
            );
            return Ok(None);
        }

        run.abort(now)?;
        scope.store().mark_run_aborted(&run).await?;

        info!(run_uuid = %self.run_uuid, project_uuid = %run.project_uuid, "Run marked ABORTED");

        Ok(Some(CollateralAction::AbortRun {
            run_uuid: self.run_uuid.clone(),
        }))
    }
}

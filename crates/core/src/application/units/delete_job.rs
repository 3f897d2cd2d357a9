// Delete-Job: abort the job's live runs, remove the job, then cancel its schedule

use crate::application::scope::TransactionScope;
use crate::application::unit::UnitOfWork;
use crate::application::units::AbortRun;
use crate::domain::{CollateralAction, JobId};
use crate::error::Result;
use async_trait::async_trait;
use tracing::{debug, info};

pub struct DeleteJob {
    job_uuid: JobId,
}

impl DeleteJob {
    pub fn new(job_uuid: impl Into<String>) -> Self {
        Self {
            job_uuid: job_uuid.into(),
        }
    }
}

#[async_trait]
impl UnitOfWork for DeleteJob {
    fn name(&self) -> &'static str {
        "delete_job"
    }

    async fn transaction(&self, scope: &mut TransactionScope) -> Result<Option<CollateralAction>> {
        let Some(job) = scope.store().find_job(&self.job_uuid).await? else {
            debug!(job_uuid = %self.job_uuid, "Job not found, nothing to delete");
            return Ok(None);
        };

        let live_runs = scope.store().find_live_job_runs(&self.job_uuid).await?;
        for run in &live_runs {
            scope.run(&AbortRun::new(run.run_uuid.as_str())).await?;
        }

        // Cascades to the job's runs and their steps
        scope.store().delete_job(&self.job_uuid).await?;

        info!(
            job_uuid = %self.job_uuid,
            project_uuid = %job.project_uuid,
            status = %job.status,
            aborted_runs = live_runs.len(),
            "Job deleted"
        );

        Ok(Some(CollateralAction::CancelJob {
            job_uuid: self.job_uuid.clone(),
        }))
    }
}

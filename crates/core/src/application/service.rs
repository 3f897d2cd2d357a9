// Project Service - caller-facing teardown operations

use crate::application::collateral::CollateralReport;
use crate::application::scope::Coordinator;
use crate::application::units::{
    AbortRun, DeleteEnvironmentImages, DeleteJob, DeleteProject, StopSession,
};
use crate::domain::ProjectFootprint;
use crate::error::{AppError, Result};
use tracing::info;

/// Entry point used by the CLI and any API boundary
///
/// Every operation either fails with the metadata left untouched and no
/// infrastructure call issued, or succeeds and returns the collateral report.
pub struct ProjectService {
    coordinator: Coordinator,
}

impl ProjectService {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// Delete a project and everything it owns
    pub async fn delete_project(&self, project_uuid: &str) -> Result<CollateralReport> {
        validate_id("project_uuid", project_uuid)?;
        info!(project_uuid = %project_uuid, "Deleting project");

        let report = self
            .coordinator
            .execute(&DeleteProject::new(project_uuid))
            .await?;

        info!(
            project_uuid = %project_uuid,
            executed = report.executed,
            failed = report.failures.len(),
            "Project deleted"
        );
        Ok(report)
    }

    pub async fn abort_run(&self, run_uuid: &str) -> Result<CollateralReport> {
        validate_id("run_uuid", run_uuid)?;
        self.coordinator.execute(&AbortRun::new(run_uuid)).await
    }

    pub async fn stop_session(
        &self,
        project_uuid: &str,
        pipeline_uuid: &str,
    ) -> Result<CollateralReport> {
        validate_id("project_uuid", project_uuid)?;
        validate_id("pipeline_uuid", pipeline_uuid)?;
        self.coordinator
            .execute(&StopSession::new(project_uuid, pipeline_uuid))
            .await
    }

    pub async fn delete_job(&self, job_uuid: &str) -> Result<CollateralReport> {
        validate_id("job_uuid", job_uuid)?;
        self.coordinator.execute(&DeleteJob::new(job_uuid)).await
    }

    pub async fn delete_environment_images(&self, project_uuid: &str) -> Result<CollateralReport> {
        validate_id("project_uuid", project_uuid)?;
        self.coordinator
            .execute(&DeleteEnvironmentImages::new(project_uuid))
            .await
    }

    /// Row counts of a project (read-only)
    pub async fn footprint(&self, project_uuid: &str) -> Result<ProjectFootprint> {
        validate_id("project_uuid", project_uuid)?;
        self.coordinator.store().project_footprint(project_uuid).await
    }
}

fn validate_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }
    if value.len() > 128 {
        return Err(AppError::Validation(format!(
            "{} too long (max 128 characters)",
            field
        )));
    }
    Ok(())
}

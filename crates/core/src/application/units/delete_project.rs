// Delete-Project: the cascading teardown of a project and everything it owns

use crate::application::scope::TransactionScope;
use crate::application::unit::UnitOfWork;
use crate::application::units::{AbortRun, DeleteEnvironmentImages, DeleteJob, StopSession};
use crate::domain::{CollateralAction, ProjectId};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use tracing::info;

/// Tears down a project inside one scope
///
/// Order:
/// 1. live interactive runs are aborted and removed (finished ones are removed too)
/// 2. every session of the project is stopped
/// 3. every job is deleted (each aborting its own live runs)
/// 4. image metadata is removed and a registry batch deletion queued
/// 5. the project row itself is removed
///
/// Live infrastructure (runs, sessions) is handled before the records that
/// describe it disappear; images come last since abort logic may still
/// reference them.
pub struct DeleteProject {
    project_uuid: ProjectId,
}

impl DeleteProject {
    pub fn new(project_uuid: impl Into<String>) -> Self {
        Self {
            project_uuid: project_uuid.into(),
        }
    }
}

#[async_trait]
impl UnitOfWork for DeleteProject {
    fn name(&self) -> &'static str {
        "delete_project"
    }

    async fn transaction(&self, scope: &mut TransactionScope) -> Result<Option<CollateralAction>> {
        let project = self.project_uuid.as_str();

        if !scope.store().project_exists(project).await? {
            return Err(AppError::NotFound(format!("Project {} not found", project)));
        }

        // 1. Interactive runs. Steps and image mappings go with them (cascade).
        let live_runs = scope.store().find_live_interactive_runs(project).await?;
        for run in &live_runs {
            scope.run(&AbortRun::new(run.run_uuid.as_str())).await?;
            scope.store().delete_run(&run.run_uuid).await?;
        }
        let finished_runs = scope.store().delete_interactive_runs(project).await?;

        // 2. Sessions, one per (project, pipeline)
        let sessions = scope.store().find_sessions(project).await?;
        for session in &sessions {
            scope
                .run(&StopSession::new(
                    session.key.project_uuid.as_str(),
                    session.key.pipeline_uuid.as_str(),
                ))
                .await?;
        }

        // 3. Jobs (nested cascade)
        let jobs = scope.store().find_jobs(project).await?;
        for job in &jobs {
            scope.run(&DeleteJob::new(job.job_uuid.as_str())).await?;
        }

        // 4. Images
        scope.run(&DeleteEnvironmentImages::new(project)).await?;

        // 5. Project row
        scope.store().delete_project(project).await?;

        info!(
            project_uuid = %project,
            aborted_runs = live_runs.len(),
            finished_runs = finished_runs,
            sessions = sessions.len(),
            jobs = jobs.len(),
            queued_actions = scope.queue().len(),
            "Project cascade prepared"
        );

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Harness;
    use crate::domain::RunStatus;
    use crate::port::BackendError;
    use crate::port::MetadataStore;

    /// P1: two STARTED runs, one session, one job with a PENDING run, three images
    fn seed(h: &Harness) {
        h.store.add_project("p1");
        h.store.add_run("r1", "p1", None, RunStatus::Started);
        h.store.add_run("r2", "p1", None, RunStatus::Started);
        h.store.add_session("p1", "pl1");
        h.store.add_job("j1", "p1");
        h.store.add_run("jr1", "p1", Some("j1"), RunStatus::Pending);
        h.store.add_image("p1", "env-a", 1);
        h.store.add_image("p1", "env-a", 2);
        h.store.add_image("p1", "env-b", 1);
    }

    #[tokio::test]
    async fn test_full_cascade() {
        let h = Harness::new();
        seed(&h);

        let report = h.coordinator.execute(&DeleteProject::new("p1")).await.unwrap();

        assert_eq!(
            h.backend.events(),
            vec![
                "begin",
                "commit",
                "abort_run:r1",
                "abort_run:r2",
                "stop_session:p1/pl1",
                "abort_run:jr1",
                "cancel_job:j1",
                "delete_images:p1",
            ]
        );
        assert_eq!(report.executed, 6);
        assert!(report.is_clean());

        let footprint = h.store.project_footprint("p1").await.unwrap();
        assert!(footprint.is_gone());
    }

    #[tokio::test]
    async fn test_finished_runs_removed_without_collateral() {
        let h = Harness::new();
        h.store.add_project("p1");
        h.store.add_run("old", "p1", None, RunStatus::Failure);

        let report = h.coordinator.execute(&DeleteProject::new("p1")).await.unwrap();

        assert!(h.store.snapshot().runs.is_empty());
        assert_eq!(h.backend.calls(), vec!["delete_images:p1"]);
        assert_eq!(report.executed, 1);
    }

    #[tokio::test]
    async fn test_job_failure_rolls_back_everything() {
        let h = Harness::new();
        seed(&h);
        let before = h.store.snapshot();
        h.store.fail_on("delete_job");

        let err = h
            .coordinator
            .execute(&DeleteProject::new("p1"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("constraint"));
        let after = h.store.snapshot();
        assert_eq!(after.projects, before.projects);
        assert_eq!(after.runs, before.runs);
        assert_eq!(after.sessions, before.sessions);
        assert_eq!(after.jobs, before.jobs);
        assert_eq!(after.images, before.images);
        assert!(h.backend.calls().is_empty());
        assert_eq!(h.backend.events(), vec!["begin", "rollback"]);
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let h = Harness::new();
        let err = h
            .coordinator
            .execute(&DeleteProject::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_partial_collateral_failure_keeps_deletion() {
        let h = Harness::new();
        seed(&h);
        h.backend.fail_call(
            "delete_images:p1",
            BackendError::Unavailable("registry down".to_string()),
        );

        let report = h.coordinator.execute(&DeleteProject::new("p1")).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].unit, "delete_environment_images");
        assert_eq!(report.succeeded(), 5);
        assert!(h.store.project_footprint("p1").await.unwrap().is_gone());
    }

    #[tokio::test]
    async fn test_other_projects_untouched() {
        let h = Harness::new();
        seed(&h);
        h.store.add_project("p2");
        h.store.add_run("other", "p2", None, RunStatus::Started);
        h.store.add_session("p2", "pl1");

        h.coordinator.execute(&DeleteProject::new("p1")).await.unwrap();

        let footprint = h.store.project_footprint("p2").await.unwrap();
        assert!(footprint.exists);
        assert_eq!(footprint.live_runs, 1);
        assert_eq!(footprint.sessions, 1);
    }
}

// Transaction port for the metadata store

use crate::domain::{
    EnvironmentImage, InteractiveSession, Job, PipelineRun, ProjectFootprint, SessionKey,
};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Metadata store (entry point for transactions and read-only queries)
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn MetadataTransaction>>;

    /// Count everything a project owns (outside any transaction)
    async fn project_footprint(&self, project_uuid: &str) -> Result<ProjectFootprint>;
}

/// Metadata operations within a transaction
///
/// Deleting a parent row removes tightly-owned children (run steps, run image
/// mappings, a job's runs) by cascade. Deleting a project that still has
/// runs, sessions, jobs or images must fail.
#[async_trait]
pub trait MetadataTransaction: Transaction {
    async fn project_exists(&mut self, project_uuid: &str) -> Result<bool>;

    async fn delete_project(&mut self, project_uuid: &str) -> Result<bool>;

    async fn find_run(&mut self, run_uuid: &str) -> Result<Option<PipelineRun>>;

    /// Interactive (non-job) runs of a project with status PENDING or STARTED
    async fn find_live_interactive_runs(&mut self, project_uuid: &str)
        -> Result<Vec<PipelineRun>>;

    /// Runs of a job with status PENDING or STARTED
    async fn find_live_job_runs(&mut self, job_uuid: &str) -> Result<Vec<PipelineRun>>;

    /// Persist an aborted run (status + finished_at) and abort its live steps
    async fn mark_run_aborted(&mut self, run: &PipelineRun) -> Result<()>;

    async fn delete_run(&mut self, run_uuid: &str) -> Result<bool>;

    /// Delete every remaining interactive run of a project
    async fn delete_interactive_runs(&mut self, project_uuid: &str) -> Result<u64>;

    async fn find_sessions(&mut self, project_uuid: &str) -> Result<Vec<InteractiveSession>>;

    async fn delete_session(&mut self, key: &SessionKey) -> Result<bool>;

    async fn find_job(&mut self, job_uuid: &str) -> Result<Option<Job>>;

    async fn find_jobs(&mut self, project_uuid: &str) -> Result<Vec<Job>>;

    async fn delete_job(&mut self, job_uuid: &str) -> Result<bool>;

    /// Delete image metadata of a project, returning the removed rows
    async fn delete_environment_images(
        &mut self,
        project_uuid: &str,
    ) -> Result<Vec<EnvironmentImage>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::RunStatus;
    use crate::error::AppError;
    use crate::port::backend::mocks::{event_log, EventLog};
    use std::sync::{Arc, Mutex};

    /// Snapshot of the in-memory store
    #[derive(Debug, Clone, Default)]
    pub struct StoreState {
        pub projects: Vec<String>,
        pub runs: Vec<PipelineRun>,
        pub sessions: Vec<InteractiveSession>,
        pub jobs: Vec<Job>,
        pub images: Vec<EnvironmentImage>,
    }

    /// In-memory metadata store with snapshot isolation
    ///
    /// A transaction works on a private copy; commit swaps it in and appends
    /// `commit` to the event log, rollback appends `rollback`. An operation
    /// name passed to `fail_on` makes that operation return a database error.
    pub struct InMemoryStore {
        state: Arc<Mutex<StoreState>>,
        fail_on: Arc<Mutex<Option<String>>>,
        events: EventLog,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::with_log(event_log())
        }

        pub fn with_log(events: EventLog) -> Self {
            Self {
                state: Arc::new(Mutex::new(StoreState::default())),
                fail_on: Arc::new(Mutex::new(None)),
                events,
            }
        }

        pub fn fail_on(&self, operation: &str) {
            *self.fail_on.lock().unwrap() = Some(operation.to_string());
        }

        pub fn snapshot(&self) -> StoreState {
            self.state.lock().unwrap().clone()
        }

        pub fn add_project(&self, project_uuid: &str) {
            self.state
                .lock()
                .unwrap()
                .projects
                .push(project_uuid.to_string());
        }

        pub fn add_run(
            &self,
            run_uuid: &str,
            project_uuid: &str,
            job_uuid: Option<&str>,
            status: RunStatus,
        ) {
            self.state.lock().unwrap().runs.push(PipelineRun {
                run_uuid: run_uuid.to_string(),
                project_uuid: project_uuid.to_string(),
                pipeline_uuid: "pipeline".to_string(),
                job_uuid: job_uuid.map(str::to_string),
                status,
                started_at: None,
                finished_at: None,
            });
        }

        pub fn add_session(&self, project_uuid: &str, pipeline_uuid: &str) {
            self.state
                .lock()
                .unwrap()
                .sessions
                .push(InteractiveSession {
                    key: SessionKey::new(project_uuid, pipeline_uuid),
                    status: crate::domain::SessionStatus::Running,
                });
        }

        pub fn add_job(&self, job_uuid: &str, project_uuid: &str) {
            self.state.lock().unwrap().jobs.push(Job {
                job_uuid: job_uuid.to_string(),
                project_uuid: project_uuid.to_string(),
                pipeline_uuid: "pipeline".to_string(),
                name: job_uuid.to_string(),
                schedule: Some("*/5 * * * *".to_string()),
                status: crate::domain::JobStatus::Started,
            });
        }

        pub fn add_image(&self, project_uuid: &str, environment_uuid: &str, tag: i64) {
            self.state.lock().unwrap().images.push(EnvironmentImage {
                project_uuid: project_uuid.to_string(),
                environment_uuid: environment_uuid.to_string(),
                tag,
            });
        }
    }

    impl Default for InMemoryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl MetadataStore for InMemoryStore {
        async fn begin_transaction(&self) -> Result<Box<dyn MetadataTransaction>> {
            let working = self.state.lock().unwrap().clone();
            self.events.lock().unwrap().push("begin".to_string());
            Ok(Box::new(InMemoryTransaction {
                working,
                shared: Arc::clone(&self.state),
                fail_on: self.fail_on.lock().unwrap().clone(),
                events: Arc::clone(&self.events),
            }))
        }

        async fn project_footprint(&self, project_uuid: &str) -> Result<ProjectFootprint> {
            let state = self.state.lock().unwrap();
            let runs: Vec<&PipelineRun> = state
                .runs
                .iter()
                .filter(|r| r.project_uuid == project_uuid)
                .collect();
            Ok(ProjectFootprint {
                exists: state.projects.iter().any(|p| p == project_uuid),
                runs: runs.len() as i64,
                live_runs: runs.iter().filter(|r| r.status.is_live()).count() as i64,
                sessions: state
                    .sessions
                    .iter()
                    .filter(|s| s.key.project_uuid == project_uuid)
                    .count() as i64,
                jobs: state
                    .jobs
                    .iter()
                    .filter(|j| j.project_uuid == project_uuid)
                    .count() as i64,
                images: state
                    .images
                    .iter()
                    .filter(|i| i.project_uuid == project_uuid)
                    .count() as i64,
            })
        }
    }

    pub struct InMemoryTransaction {
        working: StoreState,
        shared: Arc<Mutex<StoreState>>,
        fail_on: Option<String>,
        events: EventLog,
    }

    impl InMemoryTransaction {
        fn check(&self, operation: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(operation) {
                return Err(AppError::Database(format!(
                    "Foreign key constraint violation: injected failure in {}",
                    operation
                )));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Transaction for InMemoryTransaction {
        async fn commit(self: Box<Self>) -> Result<()> {
            let this = *self;
            *this.shared.lock().unwrap() = this.working;
            this.events.lock().unwrap().push("commit".to_string());
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            self.events.lock().unwrap().push("rollback".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl MetadataTransaction for InMemoryTransaction {
        async fn project_exists(&mut self, project_uuid: &str) -> Result<bool> {
            self.check("project_exists")?;
            Ok(self.working.projects.iter().any(|p| p == project_uuid))
        }

        async fn delete_project(&mut self, project_uuid: &str) -> Result<bool> {
            self.check("delete_project")?;
            let s = &self.working;
            let referenced = s.runs.iter().any(|r| r.project_uuid == project_uuid)
                || s.sessions.iter().any(|x| x.key.project_uuid == project_uuid)
                || s.jobs.iter().any(|j| j.project_uuid == project_uuid)
                || s.images.iter().any(|i| i.project_uuid == project_uuid);
            if referenced {
                return Err(AppError::Database(format!(
                    "Foreign key constraint violation: project {} still referenced",
                    project_uuid
                )));
            }
            let before = self.working.projects.len();
            self.working.projects.retain(|p| p != project_uuid);
            Ok(self.working.projects.len() < before)
        }

        async fn find_run(&mut self, run_uuid: &str) -> Result<Option<PipelineRun>> {
            self.check("find_run")?;
            Ok(self
                .working
                .runs
                .iter()
                .find(|r| r.run_uuid == run_uuid)
                .cloned())
        }

        async fn find_live_interactive_runs(
            &mut self,
            project_uuid: &str,
        ) -> Result<Vec<PipelineRun>> {
            self.check("find_live_interactive_runs")?;
            Ok(self
                .working
                .runs
                .iter()
                .filter(|r| {
                    r.project_uuid == project_uuid && r.is_interactive() && r.status.is_live()
                })
                .cloned()
                .collect())
        }

        async fn find_live_job_runs(&mut self, job_uuid: &str) -> Result<Vec<PipelineRun>> {
            self.check("find_live_job_runs")?;
            Ok(self
                .working
                .runs
                .iter()
                .filter(|r| r.job_uuid.as_deref() == Some(job_uuid) && r.status.is_live())
                .cloned()
                .collect())
        }

        async fn mark_run_aborted(&mut self, run: &PipelineRun) -> Result<()> {
            self.check("mark_run_aborted")?;
            if let Some(stored) = self
                .working
                .runs
                .iter_mut()
                .find(|r| r.run_uuid == run.run_uuid)
            {
                stored.status = run.status;
                stored.finished_at = run.finished_at;
            }
            Ok(())
        }

        async fn delete_run(&mut self, run_uuid: &str) -> Result<bool> {
            self.check("delete_run")?;
            let before = self.working.runs.len();
            self.working.runs.retain(|r| r.run_uuid != run_uuid);
            Ok(self.working.runs.len() < before)
        }

        async fn delete_interactive_runs(&mut self, project_uuid: &str) -> Result<u64> {
            self.check("delete_interactive_runs")?;
            let before = self.working.runs.len();
            self.working
                .runs
                .retain(|r| !(r.project_uuid == project_uuid && r.is_interactive()));
            Ok((before - self.working.runs.len()) as u64)
        }

        async fn find_sessions(&mut self, project_uuid: &str) -> Result<Vec<InteractiveSession>> {
            self.check("find_sessions")?;
            Ok(self
                .working
                .sessions
                .iter()
                .filter(|s| s.key.project_uuid == project_uuid)
                .cloned()
                .collect())
        }

        async fn delete_session(&mut self, key: &SessionKey) -> Result<bool> {
            self.check("delete_session")?;
            let before = self.working.sessions.len();
            self.working.sessions.retain(|s| &s.key != key);
            Ok(self.working.sessions.len() < before)
        }

        async fn find_job(&mut self, job_uuid: &str) -> Result<Option<Job>> {
            self.check("find_job")?;
            Ok(self
                .working
                .jobs
                .iter()
                .find(|j| j.job_uuid == job_uuid)
                .cloned())
        }

        async fn find_jobs(&mut self, project_uuid: &str) -> Result<Vec<Job>> {
            self.check("find_jobs")?;
            Ok(self
                .working
                .jobs
                .iter()
                .filter(|j| j.project_uuid == project_uuid)
                .cloned()
                .collect())
        }

        async fn delete_job(&mut self, job_uuid: &str) -> Result<bool> {
            self.check("delete_job")?;
            let before = self.working.jobs.len();
            self.working.jobs.retain(|j| j.job_uuid != job_uuid);
            // cascade: runs owned by the job
            self.working
                .runs
                .retain(|r| r.job_uuid.as_deref() != Some(job_uuid));
            Ok(self.working.jobs.len() < before)
        }

        async fn delete_environment_images(
            &mut self,
            project_uuid: &str,
        ) -> Result<Vec<EnvironmentImage>> {
            self.check("delete_environment_images")?;
            let (removed, kept): (Vec<_>, Vec<_>) = self
                .working
                .images
                .drain(..)
                .partition(|i| i.project_uuid == project_uuid);
            self.working.images = kept;
            Ok(removed)
        }
    }
}

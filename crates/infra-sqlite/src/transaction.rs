// SQLite Transaction Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use cascade_core::domain::{
    EnvironmentImage, InteractiveSession, Job, PipelineRun, RunStatus, SessionKey,
};
use cascade_core::error::Result;
use cascade_core::port::{MetadataTransaction, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};

const RUN_COLUMNS: &str =
    "run_uuid, project_uuid, pipeline_uuid, job_uuid, status, started_at, finished_at";

pub struct SqliteMetadataTransaction<'a> {
    tx: SqlxTransaction<'a, Sqlite>,
}

impl<'a> SqliteMetadataTransaction<'a> {
    pub fn new(tx: SqlxTransaction<'a, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Transaction for SqliteMetadataTransaction<'_> {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl MetadataTransaction for SqliteMetadataTransaction<'_> {
    async fn project_exists(&mut self, project_uuid: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE project_uuid = ?")
            .bind(project_uuid)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }

    async fn delete_project(&mut self, project_uuid: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE project_uuid = ?")
            .bind(project_uuid)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_run(&mut self, run_uuid: &str) -> Result<Option<PipelineRun>> {
        let row: Option<RunRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pipeline_runs WHERE run_uuid = ?",
            RUN_COLUMNS
        ))
        .bind(run_uuid)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(RunRow::into_run).transpose()
    }

    async fn find_live_interactive_runs(
        &mut self,
        project_uuid: &str,
    ) -> Result<Vec<PipelineRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM pipeline_runs
            WHERE project_uuid = ? AND job_uuid IS NULL AND status IN (?, ?)
            ORDER BY rowid ASC
            "#,
            RUN_COLUMNS
        ))
        .bind(project_uuid)
        .bind(RunStatus::Pending.as_str())
        .bind(RunStatus::Started.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(RunRow::into_run).collect()
    }

    async fn find_live_job_runs(&mut self, job_uuid: &str) -> Result<Vec<PipelineRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM pipeline_runs
            WHERE job_uuid = ? AND status IN (?, ?)
            ORDER BY rowid ASC
            "#,
            RUN_COLUMNS
        ))
        .bind(job_uuid)
        .bind(RunStatus::Pending.as_str())
        .bind(RunStatus::Started.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(RunRow::into_run).collect()
    }

    async fn mark_run_aborted(&mut self, run: &PipelineRun) -> Result<()> {
        sqlx::query("UPDATE pipeline_runs SET status = ?, finished_at = ? WHERE run_uuid = ?")
            .bind(run.status.as_str())
            .bind(run.finished_at)
            .bind(&run.run_uuid)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE pipeline_run_steps
            SET status = ?
            WHERE run_uuid = ? AND status IN (?, ?)
            "#,
        )
        .bind(RunStatus::Aborted.as_str())
        .bind(&run.run_uuid)
        .bind(RunStatus::Pending.as_str())
        .bind(RunStatus::Started.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_run(&mut self, run_uuid: &str) -> Result<bool> {
        // Steps and image mappings are removed by ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM pipeline_runs WHERE run_uuid = ?")
            .bind(run_uuid)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_interactive_runs(&mut self, project_uuid: &str) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM pipeline_runs WHERE project_uuid = ? AND job_uuid IS NULL")
                .bind(project_uuid)
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn find_sessions(&mut self, project_uuid: &str) -> Result<Vec<InteractiveSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT project_uuid, pipeline_uuid, status
            FROM interactive_sessions
            WHERE project_uuid = ?
            ORDER BY pipeline_uuid ASC
            "#,
        )
        .bind(project_uuid)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(SessionRow::into_session).collect()
    }

    async fn delete_session(&mut self, key: &SessionKey) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM interactive_sessions WHERE project_uuid = ? AND pipeline_uuid = ?",
        )
        .bind(&key.project_uuid)
        .bind(&key.pipeline_uuid)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_job(&mut self, job_uuid: &str) -> Result<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT job_uuid, project_uuid, pipeline_uuid, name, schedule, status
            FROM jobs WHERE job_uuid = ?
            "#,
        )
        .bind(job_uuid)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn find_jobs(&mut self, project_uuid: &str) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT job_uuid, project_uuid, pipeline_uuid, name, schedule, status
            FROM jobs WHERE project_uuid = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(project_uuid)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn delete_job(&mut self, job_uuid: &str) -> Result<bool> {
        // The job's runs (and their steps) are removed by ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM jobs WHERE job_uuid = ?")
            .bind(job_uuid)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_environment_images(
        &mut self,
        project_uuid: &str,
    ) -> Result<Vec<EnvironmentImage>> {
        let rows: Vec<ImageRow> = sqlx::query_as(
            r#"
            DELETE FROM environment_images
            WHERE project_uuid = ?
            RETURNING project_uuid, environment_uuid, tag
            "#,
        )
        .bind(project_uuid)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|r| EnvironmentImage {
                project_uuid: r.project_uuid,
                environment_uuid: r.environment_uuid,
                tag: r.tag,
            })
            .collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RunRow {
    run_uuid: String,
    project_uuid: String,
    pipeline_uuid: String,
    job_uuid: Option<String>,
    status: String,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl RunRow {
    fn into_run(self) -> Result<PipelineRun> {
        Ok(PipelineRun {
            status: self.status.parse()?,
            run_uuid: self.run_uuid,
            project_uuid: self.project_uuid,
            pipeline_uuid: self.pipeline_uuid,
            job_uuid: self.job_uuid,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    project_uuid: String,
    pipeline_uuid: String,
    status: String,
}

impl SessionRow {
    fn into_session(self) -> Result<InteractiveSession> {
        Ok(InteractiveSession {
            status: self.status.parse()?,
            key: SessionKey::new(self.project_uuid, self.pipeline_uuid),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    job_uuid: String,
    project_uuid: String,
    pipeline_uuid: String,
    name: String,
    schedule: Option<String>,
    status: String,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        Ok(Job {
            status: self.status.parse()?,
            job_uuid: self.job_uuid,
            project_uuid: self.project_uuid,
            pipeline_uuid: self.pipeline_uuid,
            name: self.name,
            schedule: self.schedule,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    project_uuid: String,
    environment_uuid: String,
    tag: i64,
}

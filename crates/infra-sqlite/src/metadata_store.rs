// SQLite MetadataStore Implementation

use crate::error::map_sqlx_error;
use crate::SqliteMetadataTransaction;
use async_trait::async_trait;
use cascade_core::domain::{ProjectFootprint, RunStatus};
use cascade_core::error::Result;
use cascade_core::port::{MetadataStore, MetadataTransaction};
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn count(&self, sql: &str, project_uuid: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .bind(project_uuid)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn begin_transaction(&self) -> Result<Box<dyn MetadataTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        debug!("Metadata transaction started");
        Ok(Box::new(SqliteMetadataTransaction::new(tx)))
    }

    async fn project_footprint(&self, project_uuid: &str) -> Result<ProjectFootprint> {
        let exists = self
            .count("SELECT COUNT(*) FROM projects WHERE project_uuid = ?", project_uuid)
            .await?
            > 0;
        let runs = self
            .count("SELECT COUNT(*) FROM pipeline_runs WHERE project_uuid = ?", project_uuid)
            .await?;

        let live_runs: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pipeline_runs WHERE project_uuid = ? AND status IN (?, ?)",
        )
        .bind(project_uuid)
        .bind(RunStatus::Pending.as_str())
        .bind(RunStatus::Started.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let sessions = self
            .count(
                "SELECT COUNT(*) FROM interactive_sessions WHERE project_uuid = ?",
                project_uuid,
            )
            .await?;
        let jobs = self
            .count("SELECT COUNT(*) FROM jobs WHERE project_uuid = ?", project_uuid)
            .await?;
        let images = self
            .count(
                "SELECT COUNT(*) FROM environment_images WHERE project_uuid = ?",
                project_uuid,
            )
            .await?;

        Ok(ProjectFootprint {
            exists,
            runs,
            live_runs,
            sessions,
            jobs,
            images,
        })
    }
}

// Migration Runner

use crate::error::map_sqlx_error;
use cascade_core::error::Result;
use sqlx::SqlitePool;
use tracing::info;

/// (version, description, SQL); each file records its own version row
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        1,
        "Project schema",
        include_str!("../migrations/001_project_schema.sql"),
    ),
    (
        2,
        "Collateral ledger",
        include_str!("../migrations/002_collateral_ledger.sql"),
    ),
];

/// Bring the schema up to the latest version
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = current_version(pool).await?;
    info!(current_version, "Running database migrations...");

    for (version, description, sql) in MIGRATIONS {
        if *version <= current_version {
            continue;
        }
        info!(version, description, "Applying migration");
        apply_migration(pool, sql).await?;
    }

    Ok(())
}

async fn current_version(pool: &SqlitePool) -> Result<i64> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    if table_exists == 0 {
        return Ok(0);
    }

    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(map_sqlx_error)?;
    Ok(version.unwrap_or(0))
}

/// Apply one migration file in a single transaction
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    for statement in sql.split(';') {
        let statement = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();

        if !statement.is_empty() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

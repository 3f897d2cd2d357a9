// SQLite CollateralLedger Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use cascade_core::error::{AppError, Result};
use cascade_core::port::{CollateralLedger, LedgerEntry, LedgerStatus, NewLedgerEntry};
use sqlx::SqlitePool;

pub struct SqliteCollateralLedger {
    pool: SqlitePool,
}

impl SqliteCollateralLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollateralLedger for SqliteCollateralLedger {
    async fn record(&self, entry: &NewLedgerEntry) -> Result<()> {
        let action = serde_json::to_string(&entry.action)?;

        sqlx::query(
            r#"
            INSERT INTO collateral_failures (
                id, unit, action, last_error, attempts, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.unit)
        .bind(action)
        .bind(&entry.error)
        .bind(LedgerStatus::Pending.as_str())
        .bind(entry.created_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list(&self, status: Option<LedgerStatus>, limit: u32) -> Result<Vec<LedgerEntry>> {
        let status = status.map(LedgerStatus::as_str);

        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, unit, action, last_error, attempts, status, created_at, updated_at
            FROM collateral_failures
            WHERE (? IS NULL OR status = ?)
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(status)
        .bind(status)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(LedgerRow::into_entry).collect()
    }

    async fn mark_resolved(&self, id: &str, now_millis: i64) -> Result<()> {
        let result =
            sqlx::query("UPDATE collateral_failures SET status = ?, updated_at = ? WHERE id = ?")
                .bind(LedgerStatus::Resolved.as_str())
                .bind(now_millis)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Ledger entry {} not found", id)));
        }
        Ok(())
    }

    async fn record_attempt(
        &self,
        id: &str,
        error: &str,
        abandon: bool,
        now_millis: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE collateral_failures
            SET attempts = attempts + 1,
                last_error = ?,
                status = CASE WHEN ? THEN ? ELSE status END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(abandon)
        .bind(LedgerStatus::Abandoned.as_str())
        .bind(now_millis)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Ledger entry {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: String,
    unit: String,
    action: String,
    last_error: Option<String>,
    attempts: i64,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl LedgerRow {
    fn into_entry(self) -> Result<LedgerEntry> {
        Ok(LedgerEntry {
            action: serde_json::from_str(&self.action)?,
            status: self.status.parse()?,
            attempts: u32::try_from(self.attempts).unwrap_or(0),
            id: self.id,
            unit: self.unit,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// Collateral Ledger Port
// Durable record of post-commit actions that failed, for operator follow-up/retry

use crate::domain::CollateralAction;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Pending,
    Resolved,
    Abandoned,
}

impl LedgerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Pending => "PENDING",
            LedgerStatus::Resolved => "RESOLVED",
            LedgerStatus::Abandoned => "ABANDONED",
        }
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LedgerStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(LedgerStatus::Pending),
            "RESOLVED" => Ok(LedgerStatus::Resolved),
            "ABANDONED" => Ok(LedgerStatus::Abandoned),
            other => Err(AppError::Validation(format!(
                "Unknown ledger status: {}",
                other
            ))),
        }
    }
}

/// A failed collateral action to persist
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub id: String,
    pub unit: String,
    pub action: CollateralAction,
    pub error: String,
    pub created_at: i64,
}

/// Persisted ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub unit: String,
    pub action: CollateralAction,
    pub last_error: Option<String>,
    pub attempts: u32,
    pub status: LedgerStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[async_trait]
pub trait CollateralLedger: Send + Sync {
    /// Persist a failure (attempts = 1, status = PENDING)
    async fn record(&self, entry: &NewLedgerEntry) -> Result<()>;

    /// List entries, oldest first
    async fn list(&self, status: Option<LedgerStatus>, limit: u32) -> Result<Vec<LedgerEntry>>;

    /// Mark an entry as resolved
    async fn mark_resolved(&self, id: &str, now_millis: i64) -> Result<()>;

    /// Record another failed attempt; `abandon` moves the entry to ABANDONED
    async fn record_attempt(
        &self,
        id: &str,
        error: &str,
        abandon: bool,
        now_millis: i64,
    ) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// In-memory ledger
    #[derive(Default)]
    pub struct InMemoryLedger {
        entries: Mutex<Vec<LedgerEntry>>,
        fail_writes: Mutex<bool>,
    }

    impl InMemoryLedger {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `record` fail (to test that ledger errors are non-fatal)
        pub fn fail_writes(&self) {
            *self.fail_writes.lock().unwrap() = true;
        }

        pub fn entries(&self) -> Vec<LedgerEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CollateralLedger for InMemoryLedger {
        async fn record(&self, entry: &NewLedgerEntry) -> Result<()> {
            if *self.fail_writes.lock().unwrap() {
                return Err(AppError::Database("ledger unavailable".to_string()));
            }
            self.entries.lock().unwrap().push(LedgerEntry {
                id: entry.id.clone(),
                unit: entry.unit.clone(),
                action: entry.action.clone(),
                last_error: Some(entry.error.clone()),
                attempts: 1,
                status: LedgerStatus::Pending,
                created_at: entry.created_at,
                updated_at: entry.created_at,
            });
            Ok(())
        }

        async fn list(&self, status: Option<LedgerStatus>, limit: u32) -> Result<Vec<LedgerEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| status.map_or(true, |s| e.status == s))
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn mark_resolved(&self, id: &str, now_millis: i64) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Ledger entry {} not found", id)))?;
            entry.status = LedgerStatus::Resolved;
            entry.updated_at = now_millis;
            Ok(())
        }

        async fn record_attempt(
            &self,
            id: &str,
            error: &str,
            abandon: bool,
            now_millis: i64,
        ) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Ledger entry {} not found", id)))?;
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
            entry.updated_at = now_millis;
            if abandon {
                entry.status = LedgerStatus::Abandoned;
            }
            Ok(())
        }
    }
}

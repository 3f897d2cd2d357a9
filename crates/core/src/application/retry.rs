// Collateral retry (RetryQueue policy)
// Replays failed post-commit actions recorded in the collateral ledger

use crate::application::collateral::{ActionOutcome, CollateralExecutor};
use crate::error::Result;
use crate::port::{CollateralLedger, LedgerStatus, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

/// Outcome of one retry pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub attempted: usize,
    pub resolved: usize,
    pub still_pending: usize,
    pub abandoned: usize,
}

/// Retries pending ledger entries against the backends
pub struct CollateralRetryService {
    ledger: Arc<dyn CollateralLedger>,
    collateral: Arc<CollateralExecutor>,
    time_provider: Arc<dyn TimeProvider>,
    max_attempts: u32,
}

impl CollateralRetryService {
    /// # Arguments
    /// * `max_attempts` - total attempts (including the original post-commit one)
    ///   after which an entry is abandoned
    pub fn new(
        ledger: Arc<dyn CollateralLedger>,
        collateral: Arc<CollateralExecutor>,
        time_provider: Arc<dyn TimeProvider>,
        max_attempts: u32,
    ) -> Self {
        Self {
            ledger,
            collateral,
            time_provider,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Retry up to `batch_size` pending entries, oldest first
    pub async fn retry_pending(&self, batch_size: u32) -> Result<RetryStats> {
        let pending = self
            .ledger
            .list(Some(LedgerStatus::Pending), batch_size)
            .await?;
        let mut stats = RetryStats::default();

        for entry in pending {
            stats.attempted += 1;
            let now = self.time_provider.now_millis();

            match self.collateral.execute(&entry.action).await {
                Ok(outcome) => {
                    self.ledger.mark_resolved(&entry.id, now).await?;
                    stats.resolved += 1;
                    info!(
                        entry_id = %entry.id,
                        action = %entry.action,
                        already_gone = outcome == ActionOutcome::AlreadyGone,
                        "Collateral retry succeeded"
                    );
                }
                Err(e) => {
                    let abandon = entry.attempts + 1 >= self.max_attempts;
                    self.ledger
                        .record_attempt(&entry.id, &e.to_string(), abandon, now)
                        .await?;
                    if abandon {
                        stats.abandoned += 1;
                        error!(
                            entry_id = %entry.id,
                            action = %entry.action,
                            attempts = entry.attempts + 1,
                            error = %e,
                            "Collateral action abandoned, operator follow-up required"
                        );
                    } else {
                        stats.still_pending += 1;
                        warn!(
                            entry_id = %entry.id,
                            action = %entry.action,
                            attempts = entry.attempts + 1,
                            error = %e,
                            "Collateral retry failed"
                        );
                    }
                }
            }
        }

        Ok(stats)
    }
}

const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Runs retry passes in the background
pub struct RetryScheduler {
    service: CollateralRetryService,
    interval: Duration,
    batch_size: u32,
}

impl RetryScheduler {
    /// `interval` is clamped to a positive period; `tokio::time::interval` panics on zero
    pub fn new(service: CollateralRetryService, interval: Duration, batch_size: u32) -> Self {
        Self {
            service,
            interval: interval.max(MIN_RETRY_INTERVAL),
            batch_size,
        }
    }

    /// Retry loop; should be spawned with tokio::spawn
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            max_attempts = self.service.max_attempts,
            "Collateral retry scheduler started"
        );

        let mut tick = interval(self.interval);

        loop {
            tick.tick().await;

            match self.service.retry_pending(self.batch_size).await {
                Ok(stats) if stats.attempted > 0 => {
                    info!(
                        attempted = stats.attempted,
                        resolved = stats.resolved,
                        still_pending = stats.still_pending,
                        abandoned = stats.abandoned,
                        "Collateral retry pass completed"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, "Collateral retry pass failed");
                }
            }
        }
    }
}

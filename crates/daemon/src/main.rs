//! Cascade Engine - Daemon Entry Point
//! Replays failed collateral actions from the ledger until shut down

mod telemetry;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use cascade_core::application::{
    CollateralExecutor, CollateralPolicy, CollateralRetryService, RetryScheduler,
};
use cascade_core::config::CascadeConfig;
use cascade_core::port::time_provider::SystemTimeProvider;
use cascade_core::port::CollateralLedger;
use cascade_infra_http::HttpBackends;
use cascade_infra_sqlite::{create_pool, run_migrations, SqliteCollateralLedger};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging (+ optional OpenTelemetry)
    let _log_guard = telemetry::init_tracing()?;
    info!("Cascade daemon v{} starting...", cascade_core::VERSION);

    // 2. Configuration
    let config = CascadeConfig::from_env().context("Invalid configuration")?;
    info!(
        db_path = %config.db_path,
        policy = %config.collateral_policy,
        orchestrator = %config.backends.orchestrator_url,
        registry = %config.backends.registry_url,
        scheduler = %config.backends.scheduler_url,
        "Configuration loaded"
    );

    // 3. Database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let pool = create_pool(&config.db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool)
        .await
        .context("Migration failed")?;

    // 4. DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let backends = HttpBackends::from_config(&config.backends)?;
    let ledger: Arc<dyn CollateralLedger> = Arc::new(SqliteCollateralLedger::new(pool.clone()));

    let collateral = Arc::new(
        CollateralExecutor::new(
            Arc::new(backends.execution),
            Arc::new(backends.registry),
            Arc::new(backends.scheduler),
        )
        .with_timeout(config.collateral_timeout),
    );

    if config.collateral_policy == CollateralPolicy::FireAndLog {
        warn!(
            "Collateral policy is fire-and-log: only entries already in the ledger will be retried"
        );
    }

    // 5. Retry scheduler
    let retry_service = CollateralRetryService::new(
        ledger,
        collateral,
        time_provider,
        config.retry.max_attempts,
    );
    let scheduler = RetryScheduler::new(
        retry_service,
        config.retry.interval,
        config.retry.batch_size,
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    info!("System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    scheduler_handle.abort();
    let _ = scheduler_handle.await;
    pool.close().await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}

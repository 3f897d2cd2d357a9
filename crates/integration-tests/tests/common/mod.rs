//! Shared fixtures: SQLite store with seeded projects and recording backends
#![allow(dead_code)]

use cascade_core::application::{CollateralExecutor, Coordinator, ProjectService};
use cascade_core::port::backend::mocks::RecordingBackend;
use cascade_core::port::id_provider::SequentialIdProvider;
use cascade_core::port::time_provider::FixedTimeProvider;
use cascade_core::port::{CollateralLedger, MetadataStore};
use cascade_infra_sqlite::{
    create_pool, run_migrations, SqliteCollateralLedger, SqliteMetadataStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub const NOW: i64 = 1_700_000_000_000;

pub struct TestEnv {
    pub pool: SqlitePool,
    pub backend: Arc<RecordingBackend>,
    pub ledger: Arc<SqliteCollateralLedger>,
    pub service: ProjectService,
}

pub struct Options {
    pub retry_queue: bool,
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            retry_queue: false,
            timeout: Duration::from_secs(5),
        }
    }
}

pub async fn setup() -> TestEnv {
    setup_with(Options::default()).await
}

pub async fn setup_with(options: Options) -> TestEnv {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    seed_p1(&pool).await;
    seed_bystander(&pool).await;

    let backend = Arc::new(RecordingBackend::new());
    let ledger = Arc::new(SqliteCollateralLedger::new(pool.clone()));
    let time_provider = Arc::new(FixedTimeProvider(NOW));

    let mut executor = CollateralExecutor::new(backend.clone(), backend.clone(), backend.clone())
        .with_timeout(options.timeout);
    if options.retry_queue {
        let ledger: Arc<dyn CollateralLedger> = ledger.clone();
        executor = executor.with_retry_queue(
            ledger,
            Arc::new(SequentialIdProvider::new("cf")),
            time_provider.clone(),
        );
    }

    let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::new(pool.clone()));
    let service = ProjectService::new(Coordinator::new(
        store,
        Arc::new(executor),
        time_provider,
    ));

    TestEnv {
        pool,
        backend,
        ledger,
        service,
    }
}

pub async fn exec(pool: &SqlitePool, statements: &[&str]) {
    for sql in statements {
        sqlx::query(sql).execute(pool).await.unwrap();
    }
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

/// Project `p1`: two STARTED runs, one live session, one job with a PENDING
/// run, three images
pub async fn seed_p1(pool: &SqlitePool) {
    exec(
        pool,
        &[
            "INSERT INTO projects (project_uuid, name) VALUES ('p1', 'analytics')",
            "INSERT INTO pipeline_runs (run_uuid, project_uuid, pipeline_uuid, status, started_at) VALUES ('r1', 'p1', 'pl1', 'STARTED', 100)",
            "INSERT INTO pipeline_runs (run_uuid, project_uuid, pipeline_uuid, status, started_at) VALUES ('r2', 'p1', 'pl2', 'STARTED', 110)",
            "INSERT INTO pipeline_run_steps (run_uuid, step_uuid, status) VALUES ('r1', 'load', 'STARTED')",
            "INSERT INTO pipeline_run_steps (run_uuid, step_uuid, status) VALUES ('r2', 'train', 'PENDING')",
            "INSERT INTO interactive_sessions (project_uuid, pipeline_uuid, status) VALUES ('p1', 'pl1', 'RUNNING')",
            "INSERT INTO jobs (job_uuid, project_uuid, pipeline_uuid, name, schedule, status) VALUES ('j1', 'p1', 'pl1', 'nightly', '0 2 * * *', 'STARTED')",
            "INSERT INTO pipeline_runs (run_uuid, project_uuid, pipeline_uuid, job_uuid, status) VALUES ('jr1', 'p1', 'pl1', 'j1', 'PENDING')",
            "INSERT INTO environment_images (project_uuid, environment_uuid, tag) VALUES ('p1', 'env-py', 1)",
            "INSERT INTO environment_images (project_uuid, environment_uuid, tag) VALUES ('p1', 'env-py', 2)",
            "INSERT INTO environment_images (project_uuid, environment_uuid, tag) VALUES ('p1', 'env-r', 1)",
            "INSERT INTO run_image_mappings (run_uuid, project_uuid, environment_uuid, tag) VALUES ('r1', 'p1', 'env-py', 2)",
        ],
    )
    .await;
}

/// Project `p2`, which no test deletes
pub async fn seed_bystander(pool: &SqlitePool) {
    exec(
        pool,
        &[
            "INSERT INTO projects (project_uuid, name) VALUES ('p2', 'bystander')",
            "INSERT INTO pipeline_runs (run_uuid, project_uuid, pipeline_uuid, status, started_at) VALUES ('q1', 'p2', 'pl9', 'STARTED', 100)",
            "INSERT INTO interactive_sessions (project_uuid, pipeline_uuid, status) VALUES ('p2', 'pl9', 'RUNNING')",
            "INSERT INTO environment_images (project_uuid, environment_uuid, tag) VALUES ('p2', 'env-py', 1)",
        ],
    )
    .await;
}

/// Backend calls expected when `p1` is deleted, in order
pub fn p1_calls() -> Vec<&'static str> {
    vec![
        "abort_run:r1",
        "abort_run:r2",
        "stop_session:p1/pl1",
        "abort_run:jr1",
        "cancel_job:j1",
        "delete_images:p1",
    ]
}

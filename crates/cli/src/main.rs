//! Cascade CLI - operator tool for project teardown
//! Runs deletions directly against the metadata database and backends

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tabled::{Table, Tabled};

use cascade_core::application::{
    CollateralExecutor, CollateralPolicy, CollateralReport, CollateralRetryService, Coordinator,
    ProjectService,
};
use cascade_core::config::CascadeConfig;
use cascade_core::domain::ProjectFootprint;
use cascade_core::port::id_provider::UuidProvider;
use cascade_core::port::time_provider::SystemTimeProvider;
use cascade_core::port::{CollateralLedger, LedgerEntry, LedgerStatus, MetadataStore};
use cascade_infra_http::HttpBackends;
use cascade_infra_sqlite::{
    create_pool, run_migrations, SqliteCollateralLedger, SqliteMetadataStore,
};

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Cascade Engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: Overrides,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

/// Flags that override the environment-driven configuration
#[derive(Args, Default)]
struct Overrides {
    /// Metadata database path
    #[arg(long, global = true, env = "CASCADE_DB_PATH")]
    db_path: Option<String>,

    /// Collateral failure policy (fire-and-log | retry-queue)
    #[arg(long, global = true, env = "CASCADE_COLLATERAL_POLICY")]
    policy: Option<CollateralPolicy>,

    /// Orchestrator base URL (runs, sessions)
    #[arg(long, global = true, env = "CASCADE_ORCHESTRATOR_URL")]
    orchestrator_url: Option<String>,

    /// Image registry base URL
    #[arg(long, global = true, env = "CASCADE_REGISTRY_URL")]
    registry_url: Option<String>,

    /// Job scheduler base URL
    #[arg(long, global = true, env = "CASCADE_SCHEDULER_URL")]
    scheduler_url: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut CascadeConfig) {
        if let Some(path) = self.db_path {
            config.db_path = shellexpand::tilde(&path).into_owned();
        }
        if let Some(policy) = self.policy {
            config.collateral_policy = policy;
        }
        if let Some(url) = self.orchestrator_url {
            config.backends.orchestrator_url = url;
        }
        if let Some(url) = self.registry_url {
            config.backends.registry_url = url;
        }
        if let Some(url) = self.scheduler_url {
            config.backends.scheduler_url = url;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Delete a project and everything it owns
    DeleteProject {
        project_uuid: String,
    },

    /// Abort a live pipeline run
    AbortRun {
        run_uuid: String,
    },

    /// Stop an interactive session
    StopSession {
        project_uuid: String,
        pipeline_uuid: String,
    },

    /// Delete a job, aborting its live runs
    DeleteJob {
        job_uuid: String,
    },

    /// Delete a project's environment images
    DeleteImages {
        project_uuid: String,
    },

    /// Show what a project still owns
    Show {
        project_uuid: String,
    },

    /// List failed collateral actions
    Pending {
        /// Filter by status (PENDING, RESOLVED, ABANDONED); all when omitted
        #[arg(short, long)]
        status: Option<LedgerStatus>,

        #[arg(short = 'n', long, default_value = "50")]
        limit: u32,
    },

    /// Retry pending collateral actions once
    Retry {
        #[arg(short = 'n', long)]
        batch: Option<u32>,
    },
}

#[derive(Tabled)]
struct FailureRow {
    unit: String,
    action: String,
    error: String,
    ledger_id: String,
}

#[derive(Tabled)]
struct LedgerRow {
    id: String,
    status: String,
    unit: String,
    action: String,
    attempts: u32,
    last_error: String,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.clone(),
            status: entry.status.to_string(),
            unit: entry.unit.clone(),
            action: entry.action.to_string(),
            attempts: entry.attempts,
            last_error: entry.last_error.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct FootprintRow {
    exists: bool,
    runs: i64,
    live_runs: i64,
    sessions: i64,
    jobs: i64,
    images: i64,
}

impl From<&ProjectFootprint> for FootprintRow {
    fn from(f: &ProjectFootprint) -> Self {
        Self {
            exists: f.exists,
            runs: f.runs,
            live_runs: f.live_runs,
            sessions: f.sessions,
            jobs: f.jobs,
            images: f.images,
        }
    }
}

/// Everything a command needs, wired against SQLite and the HTTP backends
struct App {
    config: CascadeConfig,
    service: ProjectService,
    ledger: Arc<dyn CollateralLedger>,
    collateral: Arc<CollateralExecutor>,
}

impl App {
    async fn connect(config: CascadeConfig) -> Result<Self> {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        let pool = create_pool(&config.db_path)
            .await
            .with_context(|| format!("Cannot open {}", config.db_path))?;
        run_migrations(&pool)
            .await
            .context("Migration failed")?;

        let time_provider = Arc::new(SystemTimeProvider);
        let backends = HttpBackends::from_config(&config.backends)?;
        let ledger: Arc<dyn CollateralLedger> =
            Arc::new(SqliteCollateralLedger::new(pool.clone()));
        let store: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::new(pool));

        let mut executor = CollateralExecutor::new(
            Arc::new(backends.execution),
            Arc::new(backends.registry),
            Arc::new(backends.scheduler),
        )
        .with_timeout(config.collateral_timeout);
        if config.collateral_policy == CollateralPolicy::RetryQueue {
            executor = executor.with_retry_queue(
                ledger.clone(),
                Arc::new(UuidProvider),
                time_provider.clone(),
            );
        }
        let collateral = Arc::new(executor);

        let service =
            ProjectService::new(Coordinator::new(store, collateral.clone(), time_provider));

        Ok(Self {
            config,
            service,
            ledger,
            collateral,
        })
    }
}

fn print_report(json: bool, what: &str, report: &CollateralReport) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", format!("✓ {}", what).green().bold());
    println!(
        "  {} {} executed, {} already gone, {} failed",
        "Collateral:".bold(),
        report.executed,
        report.already_gone,
        report.failures.len()
    );

    if !report.is_clean() {
        println!();
        println!("{}", "Some infrastructure cleanup did not complete:".yellow().bold());
        let rows: Vec<FailureRow> = report
            .failures
            .iter()
            .map(|f| FailureRow {
                unit: f.unit.clone(),
                action: f.action.to_string(),
                error: f.error.clone(),
                ledger_id: f.ledger_id.clone().unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cascade=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CascadeConfig::from_env().context("Invalid configuration")?;
    cli.overrides.apply(&mut config);
    let app = App::connect(config).await?;

    match cli.command {
        Commands::DeleteProject { project_uuid } => {
            let report = app.service.delete_project(&project_uuid).await?;
            print_report(cli.json, &format!("Project {} deleted", project_uuid), &report)?;
        }

        Commands::AbortRun { run_uuid } => {
            let report = app.service.abort_run(&run_uuid).await?;
            print_report(cli.json, &format!("Run {} aborted", run_uuid), &report)?;
        }

        Commands::StopSession {
            project_uuid,
            pipeline_uuid,
        } => {
            let report = app
                .service
                .stop_session(&project_uuid, &pipeline_uuid)
                .await?;
            print_report(
                cli.json,
                &format!("Session {}/{} stopped", project_uuid, pipeline_uuid),
                &report,
            )?;
        }

        Commands::DeleteJob { job_uuid } => {
            let report = app.service.delete_job(&job_uuid).await?;
            print_report(cli.json, &format!("Job {} deleted", job_uuid), &report)?;
        }

        Commands::DeleteImages { project_uuid } => {
            let report = app.service.delete_environment_images(&project_uuid).await?;
            print_report(
                cli.json,
                &format!("Images of project {} deleted", project_uuid),
                &report,
            )?;
        }

        Commands::Show { project_uuid } => {
            let footprint = app.service.footprint(&project_uuid).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&footprint)?);
            } else {
                println!("{}", format!("Project {}", project_uuid).cyan().bold());
                println!("{}", Table::new(vec![FootprintRow::from(&footprint)]));
            }
        }

        Commands::Pending { status, limit } => {
            let entries = app.ledger.list(status, limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("{}", "No collateral failures recorded".green());
            } else {
                let rows: Vec<LedgerRow> = entries.iter().map(LedgerRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Retry { batch } => {
            let retry = CollateralRetryService::new(
                app.ledger.clone(),
                app.collateral.clone(),
                Arc::new(SystemTimeProvider),
                app.config.retry.max_attempts,
            );
            let stats = retry
                .retry_pending(batch.unwrap_or(app.config.retry.batch_size))
                .await?;

            println!("{}", "Collateral retry pass".cyan().bold());
            println!("  {} {}", "Attempted:".bold(), stats.attempted);
            println!("  {} {}", "Resolved:".bold(), stats.resolved.to_string().green());
            println!(
                "  {} {}",
                "Still pending:".bold(),
                stats.still_pending.to_string().yellow()
            );
            println!("  {} {}", "Abandoned:".bold(), stats.abandoned.to_string().red());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_stop_session() {
        let cli = Cli::try_parse_from([
            "cascade",
            "--policy",
            "retry-queue",
            "stop-session",
            "p1",
            "pl1",
        ])
        .unwrap();
        assert_eq!(cli.overrides.policy, Some(CollateralPolicy::RetryQueue));
        assert!(matches!(
            cli.command,
            Commands::StopSession { ref project_uuid, ref pipeline_uuid }
                if project_uuid == "p1" && pipeline_uuid == "pl1"
        ));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = CascadeConfig::default();
        Overrides {
            db_path: Some("/tmp/cascade.db".to_string()),
            registry_url: Some("http://registry:5000".to_string()),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.db_path, "/tmp/cascade.db");
        assert_eq!(config.backends.registry_url, "http://registry:5000");
        assert_eq!(config.collateral_policy, CollateralPolicy::FireAndLog);
    }

    #[test]
    fn test_overrides_expand_home_in_db_path() {
        let mut config = CascadeConfig::default();
        Overrides {
            db_path: Some("~/cascade/meta.db".to_string()),
            ..Default::default()
        }
        .apply(&mut config);

        assert!(!config.db_path.starts_with('~'));
        assert!(config.db_path.ends_with("/cascade/meta.db"));
    }

    #[tokio::test]
    async fn test_connect_creates_database_directory() {
        let dir = std::env::temp_dir().join(format!("cascade-cli-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let db_path = dir.join("nested").join("meta.db");

        let config = CascadeConfig {
            db_path: db_path.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let app = App::connect(config).await.unwrap();

        assert!(db_path.exists());
        assert!(app.service.footprint("p1").await.unwrap().is_gone());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

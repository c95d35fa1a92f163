//! lesson-ledger - background reconciler and migration runner.

use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use lesson_ledger::adapters::clock::SystemClock;
use lesson_ledger::adapters::log_publisher::LogEventPublisher;
use lesson_ledger::adapters::postgres::{
    run_schema_migrations, FallbackMemberRepository, PostgresMemberRepository,
    PostgresPackageCatalog, PostgresUserDirectoryRepository,
};
use lesson_ledger::application::{LedgerService, ReconcilerJob};
use lesson_ledger::config::{AppConfig, RecordShape};
use lesson_ledger::ports::{MemberRepository, RecordSource};
use lesson_ledger::telemetry::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(&config.telemetry) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "lesson-ledger exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    run_schema_migrations(&pool).await?;
    info!(record_shape = ?config.database.record_shape, "Connected to database");

    let members = PostgresMemberRepository::new(pool.clone());
    let users = PostgresUserDirectoryRepository::new(pool.clone());
    let repository: Arc<dyn MemberRepository> = match config.database.record_shape {
        RecordShape::Members => Arc::new(members),
        RecordShape::Users => Arc::new(users),
        RecordShape::MembersThenUsers => Arc::new(FallbackMemberRepository::new(
            Arc::new(members),
            RecordSource::Members,
            Arc::new(users),
        )),
    };

    let service = LedgerService::new(
        repository,
        Arc::new(PostgresPackageCatalog::new(pool)),
        Arc::new(LogEventPublisher),
        Arc::new(SystemClock),
        config.ledger.settings(),
    );

    if config.ledger.migrate_on_startup {
        let summary = service.migrate_all().await?;
        info!(
            outcome = ?summary.outcome,
            migrated = summary.migrated,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "Startup migration finished"
        );
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job = ReconcilerJob::new(service.reconciler(), config.ledger.reconcile_interval());
    let worker = tokio::spawn(async move { job.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    if shutdown_tx.send(true).is_err() {
        warn!("Reconciler job already stopped");
    }
    worker.await?;
    Ok(())
}

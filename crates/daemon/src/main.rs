//! Remedy Daemon - Main Entry Point
//! Runs remediation sweeps on a schedule until Ctrl+C

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{DaemonConfig, LogFormat};
use remedy_core::application::{shutdown_channel, RemediationSweeper, SweepScheduler};
use remedy_core::port::time_provider::SystemTimeProvider;
use remedy_core::port::{OperationsClient, TimeProvider};
use remedy_infra_sqlite::{create_pool, ensure_db_dir, run_migrations, SqliteOperations};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("remedy=info"))
        .context("Failed to create env filter")?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init()?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    init_logging(config.log_format)?;

    info!("Remedy daemon v{} starting...", VERSION);
    info!(db_path = %config.db_path, "Initializing database...");

    // 3. Initialize database
    ensure_db_dir(&config.db_path).context("DB directory creation failed")?;
    let pool = create_pool(&config.db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let operations: Arc<dyn OperationsClient> =
        Arc::new(SqliteOperations::new(pool.clone(), time_provider.clone()));
    let sweeper = Arc::new(RemediationSweeper::new(operations, time_provider));

    // 5. Start sweep scheduler
    info!("Starting sweep scheduler...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler = SweepScheduler::new(sweeper, config.sweep.clone());
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown (an in-flight sweep finishes first)
    shutdown_tx.shutdown();
    match tokio::time::timeout(std::time::Duration::from_secs(30), scheduler_handle).await {
        Ok(Ok(Ok(completed))) => info!(completed_sweeps = completed, "Scheduler stopped"),
        Ok(Ok(Err(e))) => tracing::error!(error = ?e, "Scheduler failed"),
        Ok(Err(e)) => tracing::error!(error = ?e, "Scheduler task panicked"),
        Err(_) => tracing::warn!("Scheduler did not stop in time"),
    }
    pool.close().await;

    info!("Shutdown complete.");

    Ok(())
}

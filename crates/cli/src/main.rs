//! Remedy CLI - run one-off scans and sweeps against the instance store

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing_subscriber::EnvFilter;

use remedy_core::application::{InstanceScanner, RemediationSweeper};
use remedy_core::domain::{DiagnosticRecord, ServiceInstance};
use remedy_core::port::time_provider::SystemTimeProvider;
use remedy_core::port::{OperationsClient, TimeProvider};
use remedy_infra_sqlite::{create_pool, ensure_db_dir, run_migrations, SqliteOperations};

const DEFAULT_DB_PATH: &str = "~/.remedy/admin.db";

/// Exit status when `--fail-on-unresolved` is set and a sweep left instances behind
const EXIT_UNRESOLVED: i32 = 2;

#[derive(Parser)]
#[command(name = "remedy")]
#[command(about = "Terminate stuck service instances", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Instance store database path
    #[arg(long, env = "REMEDY_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Log sweep progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List running or suspended instances
    Scan,

    /// Terminate every running or suspended instance once
    Sweep {
        /// Exit with status 2 if any instance could not be terminated
        #[arg(long)]
        fail_on_unresolved: bool,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Tabled)]
struct InstanceRow {
    id: String,
    class: String,
    service_type: String,
    status: String,
    created: String,
}

impl From<&ServiceInstance> for InstanceRow {
    fn from(instance: &ServiceInstance) -> Self {
        Self {
            id: instance.id.clone(),
            class: instance.class.to_string(),
            service_type: instance.service_type.clone(),
            status: instance.status.to_string(),
            created: instance.creation_time(),
        }
    }
}

#[derive(Tabled)]
struct DiagnosticRow {
    #[tabled(rename = "#")]
    index: usize,
    id: String,
    class: String,
    service_type: String,
    created: String,
    status: String,
    outcome: String,
    error: String,
}

impl From<&DiagnosticRecord> for DiagnosticRow {
    fn from(record: &DiagnosticRecord) -> Self {
        Self {
            index: record.index,
            id: record.instance_id.clone(),
            class: record.class.to_string(),
            service_type: record.service_type.clone(),
            created: record.creation_time(),
            status: record.status.to_string(),
            outcome: record.completion.to_string(),
            error: record.error_description.clone().unwrap_or_default(),
        }
    }
}

async fn connect(db_path: &str) -> Result<Arc<dyn OperationsClient>> {
    let db_path = shellexpand::tilde(db_path).into_owned();
    ensure_db_dir(&db_path)
        .with_context(|| format!("Failed to prepare instance store at {}", db_path))?;
    let pool = create_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open instance store at {}", db_path))?;
    run_migrations(&pool).await.context("Migration failed")?;

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    Ok(Arc::new(SqliteOperations::new(pool, time_provider)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("remedy=info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let operations = connect(&cli.db_path).await?;

    match cli.command {
        Commands::Scan => {
            let instances = InstanceScanner::new(operations).scan().await?;

            if instances.is_empty() {
                println!("{}", "No running or suspended instances".green());
            } else {
                println!(
                    "{}",
                    format!("{} running or suspended instance(s)", instances.len())
                        .cyan()
                        .bold()
                );
                println!();
                let rows: Vec<InstanceRow> = instances.iter().map(InstanceRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Sweep {
            fail_on_unresolved,
            json,
        } => {
            let sweeper = RemediationSweeper::new(operations, Arc::new(SystemTimeProvider));
            let report = sweeper.sweep_report().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report.diagnostics)?);
            } else if report.diagnostics.is_empty() {
                println!(
                    "{}",
                    format!("✓ {} instance(s) terminated", report.resolved())
                        .green()
                        .bold()
                );
            } else {
                println!(
                    "{}",
                    format!(
                        "✗ {} of {} instance(s) could not be terminated",
                        report.unresolved(),
                        report.scanned()
                    )
                    .yellow()
                    .bold()
                );
                println!();
                let rows: Vec<DiagnosticRow> =
                    report.diagnostics.iter().map(DiagnosticRow::from).collect();
                println!("{}", Table::new(rows));
            }

            if fail_on_unresolved && !report.diagnostics.is_empty() {
                std::process::exit(EXIT_UNRESOLVED);
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crt_analytics::config::{DatabaseConfig, ServeConfig};
use crt_analytics::models::Actor;
use crt_analytics::{aggregation, build_router, db, ingest, report, AppState, MemoryStore, Store};

#[derive(Parser)]
#[command(name = "crt-analytics")]
#[command(about = "Weekly CRT training reports, branch summaries and audit trail", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import weekly report rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Recompute branch summaries from finalized reports
    Refresh {
        #[arg(long)]
        branch: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Run the HTTP API
    Serve(ServeConfig),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(config) => serve(&cli.database, config).await,
        command => run(&cli.database, command).await,
    }
}

async fn run(database: &DatabaseConfig, command: Commands) -> anyhow::Result<()> {
    let store = database.connect().await?;
    let actor = Actor::system();

    match command {
        Commands::InitDb => {
            store.migrate().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&store).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let log = ingest::ingest_path(&store, &csv, &actor).await?;
            println!(
                "Saved {} of {} rows from {} ({:?}).",
                log.success_count,
                log.processed_rows,
                csv.display(),
                log.status
            );
            for anomaly in &log.anomalies {
                println!("- row {}: {}", anomaly.row_index, anomaly.issue);
            }
        }
        Commands::Refresh { branch } => {
            let summaries = aggregation::refresh(&store, branch.as_deref()).await?;
            if summaries.is_empty() {
                println!("No finalized reports to summarize.");
                return Ok(());
            }

            println!("Refreshed branch summaries:");
            for summary in &summaries {
                println!(
                    "- {} grade {} (attendance {:.1}%, pass {:.1}%, syllabus {:.1}%)",
                    summary.branch_code,
                    summary.performance_grade,
                    summary.avg_attendance,
                    summary.avg_test_pass,
                    summary.syllabus_completion_percent
                );
            }
        }
        Commands::Report { out } => {
            let markdown = report::render(&store).await?;
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve(config) => return serve(database, config).await,
    }

    Ok(())
}

async fn serve(database: &DatabaseConfig, config: ServeConfig) -> anyhow::Result<()> {
    info!(
        "Starting crt-analytics v{} ({} storage)",
        env!("CARGO_PKG_VERSION"),
        config.storage()
    );

    let store: Arc<dyn Store> = if config.in_memory {
        let store = MemoryStore::new();
        db::seed(&store).await?;
        Arc::new(store)
    } else {
        Arc::new(database.connect().await?)
    };

    let bind = config.bind.clone();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("crt-analytics listening on http://{bind}");
    info!("Health check: http://{bind}/health");

    axum::serve(listener, app).await?;
    Ok(())
}

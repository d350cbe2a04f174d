use clap::{Parser, Subcommand};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bulk_indexer::demos::{run_bulk_load, run_parent_child};
use bulk_indexer::{run_until_signal, Dependencies, IndexerConfig, IndexerError};

#[derive(Parser)]
#[command(name = "bulk-indexer")]
#[command(about = "Bulk ingestion into OpenSearch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index generated documents and verify the index count
    BulkLoad,
    /// Index passport and immigration records and run join queries
    ParentChild,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_demo(command: &Commands, deps: &Dependencies) -> Result<(), IndexerError> {
    match command {
        Commands::BulkLoad => {
            let report = run_bulk_load(deps).await?;
            info!(
                indexed = report.indexed,
                elapsed = ?report.elapsed,
                documents_per_second = report.documents_per_second(),
                "Bulk load verified"
            );
        }
        Commands::ParentChild => {
            let report = run_parent_child(deps).await?;
            info!(
                french = report.french,
                english = report.english,
                "Parent/child join verified"
            );
        }
    }

    Ok(())
}

async fn run(command: Commands) -> Result<(), IndexerError> {
    let config = IndexerConfig::from_env()?;
    let deps = Dependencies::new(config).await?;

    run_until_signal(
        &deps.pipeline,
        run_demo(&command, &deps),
        tokio::signal::ctrl_c(),
    )
    .await
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => {}
        Err(IndexerError::Interrupted) => {
            warn!("Bulk indexer interrupted");
            std::process::exit(130);
        }
        Err(e) => {
            error!(error = %e, "Bulk indexer failed");
            std::process::exit(1);
        }
    }
}

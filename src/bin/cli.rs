//! meter-sync CLI
//!
//! Local execution entry point. For AWS Lambda, use `meter-sync-lambda`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use meter_sync::{
    config::{load_config, load_env_file},
    error::Result,
    models::Config,
    pipeline::{self, SyncReport},
    services::{MeterSource, Normalizer, OpenDataClient},
    storage::LocalStore,
    utils::format_elapsed,
};

/// meter-sync - NYC parking meter dataset sync
#[derive(Parser, Debug)]
#[command(
    name = "meter-sync",
    version,
    about = "Sync NYC parking meters from the open data API into MongoDB"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "meter-sync.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pull the full dataset and upsert it into the store
    Sync {
        /// Write to a JSON file in this directory instead of MongoDB
        #[arg(long)]
        local_dir: Option<PathBuf>,
    },

    /// Print the row count reported by the source
    Count,

    /// Fetch and normalize one page without writing anything
    Preview {
        /// Row offset of the page
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    load_env_file();

    log::info!("meter-sync starting...");

    let config = load_config(Some(cli.config.as_path()));

    match run(cli.command, &config).await {
        Ok(()) => {
            log::info!("Done!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Sync { local_dir } => {
            config.validate()?;

            let report = match local_dir {
                Some(dir) => {
                    let store = LocalStore::with_collection(&dir, &config.store.collection);
                    pipeline::run_sync(config, &store).await?
                }
                None => sync_to_mongo(config).await?,
            };
            log_report(&report);
        }

        Command::Count => {
            let source = OpenDataClient::new(&config.source)?;
            let count = source.fetch_total_count().await?;
            log::info!("Source reports {} parking meters", count);
        }

        Command::Preview { offset } => {
            let source = OpenDataClient::new(&config.source)?;
            let normalizer = Normalizer::from_config(&config.sync);
            let page = pipeline::run_preview(&source, &normalizer, offset).await?;

            if let Some(first) = page.records.first() {
                log::info!("First record:\n{}", serde_json::to_string_pretty(first)?);
            }
        }

        Command::Validate => pipeline::run_validate(config)?,
    }

    Ok(())
}

#[cfg(feature = "mongo")]
async fn sync_to_mongo(config: &Config) -> Result<SyncReport> {
    use meter_sync::storage::MongoStore;

    let store = MongoStore::connect(&config.store).await?;
    let result = pipeline::run_sync(config, &store).await;
    store.shutdown().await;
    result
}

#[cfg(not(feature = "mongo"))]
async fn sync_to_mongo(_config: &Config) -> Result<SyncReport> {
    Err(meter_sync::error::AppError::config(
        "built without the `mongo` feature; pass --local-dir to sync to a JSON file",
    ))
}

fn log_report(report: &SyncReport) {
    log::info!("Sync summary:");
    log::info!("    Reported total: {}", report.total_count);
    log::info!("    Fetched: {}", report.total_fetched);
    log::info!("    Written: {}", report.total_processed);
    log::info!("    Skipped: {}", report.total_skipped);
    log::info!("    Batches: {}", report.batches);
    log::info!("    Elapsed: {}", format_elapsed(report.elapsed));
}

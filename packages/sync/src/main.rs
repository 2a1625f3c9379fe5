#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the location sync service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use switchy_database::Database;
use syncloc_database::{SwitchyStore, db, store};
use syncloc_sync::config::DEFAULT_LOG_LEVEL;
use syncloc_sync::{Config, Pipeline, PipelineSettings, Scheduler, SystemClock};
use syncloc_telemetry::client::RemoteClient;

#[derive(Parser)]
#[command(name = "syncloc", about = "Underground occupancy snapshot service")]
struct Cli {
    /// Path to the TOML config file (defaults to `config.toml` next to the
    /// executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync on a fixed interval until interrupted (default)
    Run,
    /// Run a single sync cycle and exit
    Once,
    /// Create the snapshot table if it does not exist
    CreateTable,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load(&path);
    init_logging(
        config
            .as_ref()
            .map_or(DEFAULT_LOG_LEVEL, |c| c.log_level.as_str()),
    );
    let config = config?;
    log::debug!("Loaded config from {}", path.display());
    for warning in &config.warnings {
        log::warn!("{warning}");
    }

    let database = db::connect(&config.dsn).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CreateTable => {
            store::create_table(database.as_ref(), &config.table, config.limits).await?;
        }
        Commands::Once => {
            let mut pipeline = build_pipeline(&config, database)?;
            let report = pipeline.run_cycle().await.inspect_err(|e| {
                log::error!("Sync cycle failed at {} stage: {e}", e.stage());
            })?;
            println!(
                "{}: {} locations, {} in-well persons, {} columns written to {}",
                report.at,
                report.aggregate.loc_count,
                report.aggregate.inwell_person_count,
                report.columns,
                config.table
            );
        }
        Commands::Run => {
            let pipeline = build_pipeline(&config, database)?;
            let mut scheduler = Scheduler::new(pipeline, config.interval);
            scheduler
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for shutdown signal: {e}");
                        std::future::pending::<()>().await;
                    }
                    log::info!("Shutdown signal received");
                })
                .await;
        }
    }

    Ok(())
}

fn build_pipeline(
    config: &Config,
    database: Box<dyn Database>,
) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let source = RemoteClient::new(&config.address, config.client_options())?;
    let sink = SwitchyStore::new(database, config.table.clone())?;

    log::info!(
        "Syncing {} into {} every {}s",
        source.base_url(),
        sink.table(),
        config.interval.as_secs()
    );

    Ok(Pipeline::new(
        Arc::new(source),
        Arc::new(sink),
        Arc::new(SystemClock),
        PipelineSettings {
            windows: config.windows,
            limits: config.limits,
        },
    ))
}

/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: &str) {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.toml")))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

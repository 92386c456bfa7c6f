//! TDP Ingest - Data ingestion tool

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tdp_common::logging::{init_logging, LogConfig, LogLevel};
use tdp_ingest::config::IngestConfig;
use tdp_ingest::spimex::SpimexPipeline;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tdp-ingest")]
#[command(author, version, about = "TDP data ingestion tool")]
struct Cli {
    /// Data source to ingest
    #[command(subcommand)]
    source: Source,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Harvest SPIMEX oil products trade reports
    OilProducts {
        /// Number of listing pages to scan, newest first
        #[arg(short, long)]
        pages: Option<u32>,

        /// Working directory for downloaded reports
        #[arg(short, long)]
        output: Option<String>,

        /// Skip reports that fail to parse instead of aborting the run
        #[arg(long)]
        skip_invalid: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::builder()
            .log_file_prefix("tdp-ingest".to_string())
            .build()
    });
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    init_logging(&log_config)?;

    match cli.source {
        Source::OilProducts {
            pages,
            output,
            skip_invalid,
        } => {
            let mut config = IngestConfig::load()?;
            if let Some(pages) = pages {
                config.page_count = pages;
            }
            if let Some(output) = output {
                config.reports_dir = output.into();
            }
            if skip_invalid {
                config.skip_invalid_reports = true;
            }
            config.validate()?;

            info!("Ingesting SPIMEX oil products trade reports");

            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(
                    config.database.connect_timeout_secs,
                ))
                .connect(&config.database.url)
                .await?;

            let stats = SpimexPipeline::new(config, pool)?.run().await?;

            info!(
                records = stats.records_ingested,
                reports = stats.reports_downloaded + stats.reports_already_present,
                "Total time elapsed: {:.2}s",
                stats.duration_seconds
            );
        },
    }

    info!("Ingestion complete");
    Ok(())
}

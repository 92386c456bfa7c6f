//! TDP Ingest Library
//!
//! Tools for harvesting exchange trade reports and loading them into the
//! TDP store.
//!
//! # Supported Data Sources
//!
//! - **SPIMEX oil products**: daily trade result spreadsheets published on
//!   the exchange's paginated results listing
//!
//! # Example
//!
//! ```no_run
//! use tdp_ingest::config::IngestConfig;
//! use tdp_ingest::spimex::SpimexPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let pool = sqlx::PgPool::connect(&config.database.url).await?;
//!     let stats = SpimexPipeline::new(config, pool)?.run().await?;
//!     tracing::info!(records = stats.records_ingested, "done");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod spimex;

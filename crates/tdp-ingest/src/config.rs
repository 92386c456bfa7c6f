//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Default exchange site origin.
pub const DEFAULT_SITE_URL: &str = "https://spimex.com";

/// Default path of the paginated trade results listing.
pub const DEFAULT_LISTING_PATH: &str = "/markets/oil_products/trades/results/";

/// Default number of listing pages to scan (scanned from this page down to 1).
pub const DEFAULT_PAGE_COUNT: u32 = 45;

/// Default working directory for downloaded reports.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Default HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default cap on simultaneous report downloads.
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 10;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/tdp";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Ingest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Exchange site origin, prefixed onto extracted report links
    pub site_url: String,

    /// Path of the paginated results listing on the site
    pub listing_path: String,

    /// Listing pages are scanned from this page number down to 1
    pub page_count: u32,

    /// Working directory holding downloaded reports for the run
    pub reports_dir: PathBuf,

    /// HTTP timeout in seconds for listing and report requests
    pub http_timeout_secs: u64,

    /// Cap on simultaneous report downloads
    pub download_concurrency: usize,

    /// Skip reports that fail to parse instead of aborting the run
    pub skip_invalid_reports: bool,

    pub database: DatabaseConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl IngestConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = IngestConfig {
            site_url: std::env::var("TDP_SITE_URL")
                .unwrap_or_else(|_| DEFAULT_SITE_URL.to_string()),
            listing_path: std::env::var("TDP_LISTING_PATH")
                .unwrap_or_else(|_| DEFAULT_LISTING_PATH.to_string()),
            page_count: std::env::var("TDP_PAGE_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE_COUNT),
            reports_dir: std::env::var("TDP_REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORTS_DIR)),
            http_timeout_secs: std::env::var("TDP_HTTP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            download_concurrency: std::env::var("TDP_DOWNLOAD_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DOWNLOAD_CONCURRENCY),
            skip_invalid_reports: std::env::var("TDP_SKIP_INVALID_REPORTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// URL of one listing page
    pub fn listing_page_url(&self, page: u32) -> String {
        format!(
            "{}{}?page=page-{}",
            self.site_url, self.listing_path, page
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.site_url.is_empty() {
            anyhow::bail!("Site URL cannot be empty");
        }

        if self.site_url.ends_with('/') {
            anyhow::bail!("Site URL must not carry a trailing slash (it is prefixed onto absolute link paths)");
        }

        if self.page_count == 0 {
            anyhow::bail!("Page count must be greater than 0");
        }

        if self.http_timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be greater than 0");
        }

        if self.download_concurrency == 0 {
            anyhow::bail!("Download concurrency must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            page_count: DEFAULT_PAGE_COUNT,
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            skip_invalid_reports: false,
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

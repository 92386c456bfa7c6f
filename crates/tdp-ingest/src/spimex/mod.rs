// SPIMEX Oil Products Ingestion Module
//
// Harvests the daily oil-products trade result spreadsheets published on the
// exchange's paginated results listing and loads the parsed instrument rows
// into PostgreSQL.
//
// Architecture follows the per-source split used across TDP ingesters:
// - Fetch: HTTP client for listing pages
// - Extract: href scan over the listing HTML
// - Download: idempotent report collection into a local working directory
// - Parse: fixed-layout XLS grammar producing instrument rows
// - Store: single-transaction batch insert into PostgreSQL
// - Pipeline: orchestration workflow
//
// Data source:
// - Listing: https://spimex.com/markets/oil_products/trades/results/?page=page-{N}
// - Reports: https://spimex.com/upload/reports/oil_xls/*.xls

pub mod downloader;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod storage;

// Re-export main types
pub use downloader::{report_file_name, DownloadOutcome, ReportDownloader};
pub use extractor::LinkExtractor;
pub use fetcher::PageFetcher;
pub use models::TradeRecord;
pub use parser::{classify_row, RowKind, SkipReason, XlsReportParser};
pub use pipeline::{PipelineStats, SpimexPipeline};
pub use storage::TradeStorage;

// ============================================================================
// Report Grammar Constants
// ============================================================================

/// Listing lines must contain this path fragment to be considered report links
pub const REPORT_PATH_PATTERN: &str = "/upload/reports/oil_xls/";

/// Row index of the header cell carrying the trade date
pub const TRADE_DATE_ROW: usize = 3;

/// Column index of the header cell carrying the trade date
pub const TRADE_DATE_COL: usize = 1;

/// Day-month-year format of the trade date header cell
pub const TRADE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Column index of the exchange product code
pub const EXCHANGE_PRODUCT_ID_COL: usize = 1;

/// Column index of the exchange product name
pub const EXCHANGE_PRODUCT_NAME_COL: usize = 2;

/// Column index of the delivery basis name
pub const DELIVERY_BASIS_NAME_COL: usize = 3;

/// Column index of the traded volume
pub const VOLUME_COL: usize = 4;

/// Column index of the traded total
pub const TOTAL_COL: usize = 5;

/// Minimum number of cells a data row must carry (contract count is the last cell)
pub const MIN_ROW_CELLS: usize = 7;

/// Column header phrase above the contract-count column
pub const CONTRACT_COUNT_HEADER: &str = "Количество\nДоговоров,\nшт.";

/// Cell values marking a header/footer/total row that carries no instrument
pub const SKIP_CELL_VALUES: [&str; 5] = [
    "",
    "-",
    CONTRACT_COUNT_HEADER,
    "Итого:",
    "Итого по секции:",
];

/// Result type for SPIMEX ingestion operations
pub type Result<T> = std::result::Result<T, SpimexError>;

/// Error types for SPIMEX ingestion
#[derive(Debug, thiserror::Error)]
pub enum SpimexError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Fetch error: HTTP {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {item}: {cause}")]
    Parse { item: String, cause: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SpimexError {
    /// Build a parse error for a named item (report file, row, header cell)
    pub fn parse(item: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        SpimexError::Parse {
            item: item.into(),
            cause: cause.to_string(),
        }
    }
}

impl From<regex::Error> for SpimexError {
    fn from(err: regex::Error) -> Self {
        SpimexError::InvalidInput(err.to_string())
    }
}

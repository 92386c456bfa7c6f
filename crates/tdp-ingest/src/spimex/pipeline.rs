//! SPIMEX harvesting pipeline orchestration
//!
//! Stages run sequentially with internal fan-out: discovery over the listing
//! pages, download of every discovered report, one-transaction ingest of the
//! parsed rows, then removal of the working directory. Any stage failure
//! propagates and leaves the downloaded reports on disk for inspection.

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use reqwest::Client;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::IngestConfig;

use super::downloader::{report_file_name, DownloadOutcome, ReportDownloader};
use super::extractor::LinkExtractor;
use super::fetcher::PageFetcher;
use super::models::TradeRecord;
use super::parser::XlsReportParser;
use super::storage::TradeStorage;
use super::{Result, REPORT_PATH_PATTERN};

/// Aggregate result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub pages_scanned: u32,
    pub reports_discovered: usize,
    pub reports_downloaded: usize,
    pub reports_already_present: usize,
    pub records_ingested: usize,
    pub duration_seconds: f64,
}

/// Orchestrator for the SPIMEX oil-products harvest
pub struct SpimexPipeline {
    config: IngestConfig,
    fetcher: PageFetcher,
    extractor: LinkExtractor,
    downloader: ReportDownloader,
    storage: TradeStorage,
}

impl SpimexPipeline {
    /// Create a pipeline; the HTTP client and the download permit pool are
    /// built once here and shared by every task of the run
    pub fn new(config: IngestConfig, db: PgPool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent("TDP-Spimex-Ingester/1.0")
            .build()?;

        let fetcher = PageFetcher::new(client.clone());
        let extractor = LinkExtractor::new(&config.site_url)?;
        let downloader =
            ReportDownloader::new(client, &config.reports_dir, config.download_concurrency);
        let storage = TradeStorage::new(db);

        Ok(Self {
            config,
            fetcher,
            extractor,
            downloader,
            storage,
        })
    }

    /// Run the full harvest: discover, download, ingest, cleanup
    pub async fn run(&self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        info!(
            pages = self.config.page_count,
            site = %self.config.site_url,
            "Starting SPIMEX oil products harvest"
        );

        let report_urls = self.discover().await?;
        let (reports_downloaded, reports_already_present) = self.download(&report_urls).await?;
        let records = self.parse_reports().await?;
        let records_ingested = self.storage.ingest(&records).await?;
        self.cleanup().await?;

        let duration = start_time.elapsed();

        let stats = PipelineStats {
            pages_scanned: self.config.page_count,
            reports_discovered: report_urls.len(),
            reports_downloaded,
            reports_already_present,
            records_ingested,
            duration_seconds: duration.as_secs_f64(),
        };

        info!(
            "Harvest complete: {} pages, {} reports ({} new, {} already present), {} records in {:.2}s",
            stats.pages_scanned,
            stats.reports_discovered,
            stats.reports_downloaded,
            stats.reports_already_present,
            stats.records_ingested,
            stats.duration_seconds
        );

        Ok(stats)
    }

    /// Discovery stage: fetch every listing page (highest page number first)
    /// and extract report URLs, collected in page order
    ///
    /// The first page failure surfaces at the join point; already-spawned
    /// sibling fetches run to completion and their results are dropped.
    async fn discover(&self) -> Result<Vec<String>> {
        let pages: Vec<u32> = (1..=self.config.page_count).rev().collect();
        let progress = ProgressBar::new(pages.len() as u64);

        let mut handles: Vec<JoinHandle<Result<Vec<String>>>> = Vec::with_capacity(pages.len());
        for page in pages {
            let fetcher = self.fetcher.clone();
            let extractor = self.extractor.clone();
            let url = self.config.listing_page_url(page);

            handles.push(tokio::spawn(async move {
                let lines = fetcher.fetch(&url).await?;
                Ok(extractor.extract(&lines, REPORT_PATH_PATTERN))
            }));
        }

        let mut report_urls = Vec::new();
        for handle in handles {
            let urls = handle.await??;
            report_urls.extend(urls);
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            reports = report_urls.len(),
            pages = self.config.page_count,
            "Discovery complete"
        );

        Ok(report_urls)
    }

    /// Download stage: collect every discovered report, then surface the
    /// first failure only after all downloads have finished (full barrier)
    async fn download(&self, report_urls: &[String]) -> Result<(usize, usize)> {
        let progress = ProgressBar::new(report_urls.len() as u64);

        let mut handles: Vec<JoinHandle<Result<DownloadOutcome>>> =
            Vec::with_capacity(report_urls.len());
        for url in report_urls {
            let downloader = self.downloader.clone();
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                let name = report_file_name(&url);
                downloader.collect(&url, &name).await
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await?);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let mut downloaded = 0;
        let mut already_present = 0;
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(DownloadOutcome::Downloaded) => downloaded += 1,
                Ok(DownloadOutcome::AlreadyPresent) => already_present += 1,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                },
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        info!(
            downloaded = downloaded,
            already_present = already_present,
            "Download complete"
        );

        Ok((downloaded, already_present))
    }

    /// Ingest stage, part 1: parse the working directory on the blocking pool
    async fn parse_reports(&self) -> Result<Vec<TradeRecord>> {
        if !tokio::fs::try_exists(&self.config.reports_dir).await? {
            info!("No reports directory, nothing to parse");
            return Ok(Vec::new());
        }

        let parser =
            XlsReportParser::new().skip_invalid_reports(self.config.skip_invalid_reports);
        let reports_dir = self.config.reports_dir.clone();

        let records =
            tokio::task::spawn_blocking(move || parser.parse_dir(&reports_dir, "xls")).await??;

        info!(records = records.len(), "Parsed collected reports");

        Ok(records)
    }

    /// Cleanup stage: drop the working directory wholesale
    ///
    /// Only reached after a successful ingest; a failed run keeps the
    /// downloaded reports for diagnosis and re-run.
    async fn cleanup(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.config.reports_dir).await {
            Ok(()) => {
                info!(dir = %self.config.reports_dir.display(), "Removed reports directory");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %self.config.reports_dir.display(), "No reports directory to remove");
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }
}

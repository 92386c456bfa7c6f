//! Idempotent report collection into the working directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{Result, SpimexError};

/// Derive the local file name for a report URL: `report_{last path segment}`
pub fn report_file_name(url: &str) -> String {
    let basename = url.rsplit('/').next().unwrap_or(url);
    format!("report_{}", basename)
}

/// What a `collect` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The report was fetched and written
    Downloaded,
    /// A file with that name already existed; no network call was made
    AlreadyPresent,
}

/// Downloader writing reports into a shared working directory
///
/// All clones share one semaphore, so the real download concurrency across
/// the whole pipeline stays capped. The exists-check and the write are not
/// atomic: two racing collects for the same absent name may both download,
/// and the last write wins. Partial files are left in place on failure for
/// inspection and re-run.
#[derive(Debug, Clone)]
pub struct ReportDownloader {
    client: Client,
    reports_dir: PathBuf,
    permits: Arc<Semaphore>,
}

impl ReportDownloader {
    /// Create a downloader capped at `concurrency` simultaneous downloads
    pub fn new(client: Client, reports_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            client,
            reports_dir: reports_dir.into(),
            permits: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Working directory the reports are collected into
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Download `report_url` into `{reports_dir}/{report_name}`
    ///
    /// A no-op when the target file already exists.
    pub async fn collect(&self, report_url: &str, report_name: &str) -> Result<DownloadOutcome> {
        let target = self.reports_dir.join(report_name);

        if tokio::fs::try_exists(&target).await? {
            debug!(report = %report_name, "Report already exists, skipping");
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SpimexError::InvalidInput("download pool is closed".to_string()))?;

        tokio::fs::create_dir_all(&self.reports_dir).await?;

        debug!(report = %report_name, url = %report_url, "Downloading report");

        let response = self.client.get(report_url).send().await?;

        if !response.status().is_success() {
            return Err(SpimexError::HttpStatus {
                url: report_url.to_string(),
                status: response.status(),
            });
        }

        let mut file = tokio::fs::File::create(&target).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;

        Ok(DownloadOutcome::Downloaded)
    }
}

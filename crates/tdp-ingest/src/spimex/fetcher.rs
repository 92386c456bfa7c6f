//! Listing page retrieval

use reqwest::Client;
use tracing::debug;

use super::{Result, SpimexError};

/// HTTP fetcher for paginated listing pages
///
/// Holds a clone of the pipeline-wide `reqwest::Client`; any number of
/// fetches may be in flight at once. Failures are never retried here — they
/// surface to the caller's join point.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Create a fetcher over a shared client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch a listing page and return its body as lines
    pub async fn fetch(&self, url: &str) -> Result<Vec<String>> {
        debug!(url = %url, "Fetching listing page");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SpimexError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response.text().await?;

        Ok(body.lines().map(str::to_owned).collect())
    }
}

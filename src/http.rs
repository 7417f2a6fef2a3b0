//! Shared upstream HTTP client with retry on transient failures

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::LAST_MODIFIED;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::{debug, instrument};

use crate::config::HttpConfig;
use crate::ndbc::spectra::parse_last_modified;
use crate::{Result, SwellcastError};

/// A response body with the server's `Last-Modified` time, if any
#[derive(Debug, Clone)]
pub struct FetchedText {
    pub body: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ClientWithMiddleware,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| SwellcastError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(100), Duration::from_secs(2))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SwellcastError::fetch(format!("{url} returned {status}")));
        }
        Ok(response)
    }

    /// GET a text body. Empty bodies are an error.
    #[instrument(skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Result<FetchedText> {
        let response = self.get(url).await?;
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_last_modified);

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(SwellcastError::fetch(format!("{url} returned an empty body")));
        }
        debug!("Fetched {} bytes", body.len());

        Ok(FetchedText {
            body,
            last_modified,
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.get(url).await?.bytes().await?;
        if bytes.is_empty() {
            return Err(SwellcastError::fetch(format!("{url} returned an empty body")));
        }
        debug!("Fetched {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

// src/ingest/providers/http_csv.rs
use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::config::LeaderboardConfig;
use crate::error::FetchError;
use crate::ingest::types::{Source, SourceFetcher};

/// Upper bound on total attempts per fetch.
pub const MAX_ATTEMPTS: u8 = 5;

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 8_000;

/// Wait before retry number `attempt` (1-based): 500ms doubling, capped at 8s.
pub fn backoff_delay(attempt: u8) -> Duration {
    let ms = BACKOFF_BASE_MS
        .checked_shl(u32::from(attempt.saturating_sub(1)))
        .filter(|ms| *ms <= BACKOFF_CAP_MS)
        .unwrap_or(BACKOFF_CAP_MS);
    Duration::from_millis(ms)
}

/// Fetches published CSV exports over HTTP.
///
/// Every request carries a fresh cache-busting query parameter: spreadsheet
/// publish endpoints sit behind caches that otherwise serve stale exports
/// for minutes.
pub struct HttpCsvFetcher {
    client: Client,
    timeout: Duration,
    max_attempts: u8,
    cache_buster_param: String,
    last_stamp: AtomicI64,
}

impl HttpCsvFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_attempts: 1,
            cache_buster_param: "t".to_string(),
            last_stamp: AtomicI64::new(0),
        }
    }

    pub fn from_config(cfg: &LeaderboardConfig) -> Self {
        Self::new()
            .with_timeout(cfg.request_timeout())
            .with_attempts(cfg.max_attempts)
            .with_cache_buster_param(cfg.cache_buster_param.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_ATTEMPTS);
        self
    }

    pub fn with_cache_buster_param(mut self, param: impl Into<String>) -> Self {
        self.cache_buster_param = param.into();
        self
    }

    /// Milliseconds since the epoch, bumped so it strictly increases per call.
    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_stamp.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn request_url(&self, endpoint: &str) -> Result<Url, FetchError> {
        cache_busted_url(endpoint, &self.cache_buster_param, self.next_stamp())
    }

    async fn fetch_once(&self, url: Url) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }
}

impl Default for HttpCsvFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Append `param=stamp` to `endpoint`, keeping its existing query pairs.
pub fn cache_busted_url(endpoint: &str, param: &str, stamp: i64) -> Result<Url, FetchError> {
    let mut url =
        Url::parse(endpoint).map_err(|_| FetchError::InvalidEndpoint(endpoint.to_string()))?;
    url.query_pairs_mut()
        .append_pair(param, &stamp.to_string());
    Ok(url)
}

#[async_trait]
impl SourceFetcher for HttpCsvFetcher {
    async fn fetch_csv(&self, source: &Source) -> Result<String, FetchError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let url = self.request_url(&source.endpoint)?;
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        source = %source.id,
                        attempt,
                        "csv fetch failed"
                    );
                    counter!("leaderboard_fetch_failures_total").increment(1);
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "http-csv"
    }
}

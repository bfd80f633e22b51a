//! HTTP client for catalog scraping with rate limiting and retry policy
//!
//! One client is built per pipeline run and shared (cheaply cloned) by every page worker:
//! a pooled `reqwest::Client`, a `governor` rate limiter, and capped exponential backoff on
//! transient status codes.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER, USER_AGENT},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::infrastructure::config::ScrapingConfig;
use crate::infrastructure::parsing::ParsingError;

/// Status codes worth another attempt
pub const RETRYABLE_STATUS: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Upper bound on a server-provided `Retry-After`
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

const ACCEPT_VALUE: &str = "text/html,application/json,application/xhtml+xml,*/*;q=0.9";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Why a single page could not be fetched or understood
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error("Render failed for {url}: {reason}")]
    Render { url: String, reason: String },

    #[error("Background task failed: {0}")]
    Join(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect() || source.is_request(),
            Self::Status { status, .. } => RETRYABLE_STATUS.contains(status),
            _ => false,
        }
    }
}

/// HTTP client configuration for scraping
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff_base: Duration,
    /// 0 disables client-side rate limiting
    pub max_requests_per_second: u32,
}

impl HttpClientConfig {
    pub fn from_scraping_config(config: &ScrapingConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.retry_backoff_base_ms),
            max_requests_per_second: config.requests_per_second,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_scraping_config(&ScrapingConfig::default())
    }
}

/// A successful response, body already read
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

/// Rate limited, retrying HTTP client; clones share the pool and the limiter
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    rate_limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .pool_max_idle_per_host(32)
            .build()
            .context("Failed to create HTTP client")?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    pub fn from_scraping_config(config: &ScrapingConfig) -> anyhow::Result<Self> {
        Self::new(HttpClientConfig::from_scraping_config(config))
    }

    /// GET with retry on transient failures; non-success statuses become [`FetchError::Status`]
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let attempts = self.config.max_retries + 1;
        let mut attempt = 1;

        loop {
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err((error, retry_after)) if error.is_retryable() && attempt < attempts => {
                    let delay = backoff_delay(attempt, self.config.backoff_base, retry_after)
                        + jitter(self.config.backoff_base);
                    warn!(
                        "Attempt {}/{} failed for {}: {} (retrying in {:?})",
                        attempt, attempts, url, error, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err((error, _)) => return Err(error),
            }
        }
    }

    /// GET and return the body text
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        Ok(self.fetch(url).await?.body)
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, (FetchError, Option<Duration>)> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!("🌐 HTTP GET {}", url);
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| (transport(e), None))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err((
                FetchError::Status {
                    url: url.to_string(),
                    status,
                },
                retry_after,
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| (transport(e), None))?;

        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(FetchedPage {
            url: final_url,
            status,
            content_type,
            body,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

/// `base * 2^(attempt-1)`, or the server's `Retry-After` when that is longer (capped)
pub fn backoff_delay(attempt: u32, base: Duration, retry_after: Option<Duration>) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    match retry_after {
        Some(server) => exponential.max(server.min(MAX_RETRY_AFTER)),
        None => exponential,
    }
}

fn jitter(base: Duration) -> Duration {
    let max_ms = u64::try_from(base.as_millis() / 4).unwrap_or(0);
    Duration::from_millis(fastrand::u64(0..=max_ms))
}

/// Append query parameters to a base URL, replacing any existing value of the same key
pub fn build_url<'a, I>(base: &str, params: I) -> Result<Url, FetchError>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    let mut url = Url::parse(base).map_err(|e| FetchError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;

    let params: Vec<(&str, String)> = params.into_iter().collect();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(name, _)| name == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(kept);
        for (key, value) in &params {
            query.append_pair(key, value);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_zero_rate_disables_limiter() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        let client = HttpClient::new(config).unwrap();
        assert!(client.rate_limiter.is_none());
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let base = Duration::from_millis(300);
        assert_eq!(backoff_delay(1, base, None), Duration::from_millis(300));
        assert_eq!(backoff_delay(2, base, None), Duration::from_millis(600));
        assert_eq!(backoff_delay(3, base, None), Duration::from_millis(1200));
    }

    #[test]
    fn test_retry_after_is_respected_but_capped() {
        let base = Duration::from_millis(300);
        assert_eq!(
            backoff_delay(1, base, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            backoff_delay(1, base, Some(Duration::from_secs(3600))),
            MAX_RETRY_AFTER
        );
    }

    #[test]
    fn test_status_retry_classification() {
        let status = |status| FetchError::Status {
            url: "http://x".into(),
            status,
        };
        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(status(StatusCode::GATEWAY_TIMEOUT).is_retryable());
        assert!(!status(StatusCode::NOT_FOUND).is_retryable());
        assert!(!FetchError::from(ParsingError::invalid_json("x")).is_retryable());
    }

    #[test]
    fn test_build_url() {
        let url = build_url(
            "https://cpus.axiomgaming.net/search",
            [("page", "2".to_string()), ("q", String::new()), ("sort", "name".to_string())],
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://cpus.axiomgaming.net/search?page=2&q=&sort=name");

        let url = build_url(
            "https://www.cybenetics.com/index.php?option=psu-performance-database&page=1",
            [("page", "5".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.cybenetics.com/index.php?option=psu-performance-database&page=5"
        );

        assert!(build_url("not a url", std::iter::empty()).is_err());
    }
}

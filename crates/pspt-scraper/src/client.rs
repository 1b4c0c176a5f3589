use std::time::Duration;

use async_trait::async_trait;
use pspt_core::TtlCache;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

/// Lifetime of a cached page body.
pub const PAGE_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Raw page access used by the refresh and search pipelines.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, serving and storing the body under `cache_key`.
    async fn fetch_page_keyed(&self, cache_key: &str, url: &str) -> Result<String, ScraperError>;

    /// Fetches `url` cached under `source:{url}`.
    async fn fetch_page(&self, url: &str) -> Result<String, ScraperError> {
        self.fetch_page_keyed(&format!("source:{url}"), url).await
    }
}

/// HTTP client for storefront HTML pages.
///
/// Non-2xx responses become typed errors. Network failures, 429 and other
/// unexpected statuses are retried with exponential backoff up to
/// `max_retries` additional attempts; 404 is returned at once. Successful
/// bodies are cached for [`PAGE_CACHE_TTL`].
pub struct StorefrontClient {
    client: Client,
    max_retries: u32,
    /// Base delay for exponential backoff: `backoff_base_ms * 2^attempt`.
    backoff_base_ms: u64,
    cache: TtlCache<String>,
}

impl StorefrontClient {
    /// Creates a client with the given timeout, `User-Agent` and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_ms,
            cache: TtlCache::new(PAGE_CACHE_TTL),
        })
    }

    /// Number of live or not-yet-evicted cached pages.
    #[must_use]
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    async fn get_text(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                url: url.to_owned(),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for StorefrontClient {
    async fn fetch_page_keyed(&self, cache_key: &str, url: &str) -> Result<String, ScraperError> {
        if let Some(body) = self.cache.get(cache_key) {
            tracing::debug!(cache_key, "page cache hit");
            return Ok(body);
        }

        reqwest::Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_text(url)
        })
        .await?;

        self.cache.insert(cache_key, body.clone());
        Ok(body)
    }
}

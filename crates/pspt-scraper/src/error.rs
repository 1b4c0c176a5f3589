use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid storefront URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScraperError {
    /// HTTP status carried by the error, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ScraperError::Http(e) => e.status().map(|s| s.as_u16()),
            ScraperError::RateLimited { .. } => Some(429),
            ScraperError::NotFound { .. } => Some(404),
            ScraperError::UnexpectedStatus { status, .. } => Some(*status),
            ScraperError::InvalidUrl { .. } => None,
        }
    }
}

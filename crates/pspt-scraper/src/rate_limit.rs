//! Retry with exponential backoff for storefront page fetches.
//!
//! Transient failures (network errors, 429, unexpected non-2xx statuses) are
//! retried. A 404 or a malformed URL is returned at once.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. }
            | ScraperError::Http(_)
            | ScraperError::UnexpectedStatus { .. }
    )
}

/// Delay before retry number `attempt + 1`: `base_ms * 2^attempt`.
pub(crate) fn backoff_delay(backoff_base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(backoff_base_ms.saturating_mul(1u64 << attempt.min(62)))
}

/// Runs `operation`, retrying retriable errors up to `max_retries` additional
/// times. The last error is returned once retries are exhausted.
///
/// With `max_retries = 2` and `backoff_base_ms = 500` the operation runs at
/// most three times, sleeping 500 ms and then 1000 ms in between.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_ms, attempt);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient storefront error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

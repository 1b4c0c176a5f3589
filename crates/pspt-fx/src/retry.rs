//! Retry with exponential back-off for the reference lookups.
//!
//! Every upstream failure is treated as transient, including malformed or
//! unsuccessful payloads; only a misconfigured base URL stops at once.

use std::future::Future;
use std::time::Duration;

use crate::error::FxError;

pub(crate) fn is_retriable(err: &FxError) -> bool {
    !matches!(err, FxError::InvalidBaseUrl(_))
}

/// Runs `operation` with up to `max_retries` additional attempts, sleeping
/// `backoff_base_ms * 2^n` before retry `n + 1`.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FxError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
                attempt += 1;
                tracing::warn!(
                    label,
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "reference lookup failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

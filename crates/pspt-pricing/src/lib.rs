//! Refresh orchestration, background refresh jobs, and price presentation
//! on top of the scraper, FX, and persistence layers.

pub mod error;
pub mod games;
pub mod jobs;
pub mod quotes;
pub mod refresh;
pub mod services;

#[cfg(test)]
mod testing;

pub use error::PricingError;
pub use games::{GamePriceRecord, GamePriceSearch, GameSearchMeta, GameSearchOutcome};
pub use jobs::{JobRetention, JobStatus, JobTracker, RefreshJob, JOB_BATCH_SIZE};
pub use quotes::{PricedRow, QuoteService};
pub use refresh::{BatchOutcome, CountryRefresh, RefreshResult, RefreshService, RefreshTarget};
pub use services::Services;

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to two decimal places, halves away from zero.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps an optional page size into `[1, max]`, substituting `default` when absent.
pub(crate) fn clamp_window(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

/// Slices `[offset, offset + limit)` out of `items`, empty when `offset` is past the end.
pub(crate) fn window<T>(items: &[T], offset: usize, limit: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    &items[start..end]
}

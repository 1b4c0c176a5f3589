//! Per-country price refresh and windowed batch orchestration.
//!
//! A country refresh ends in exactly one of three states:
//!
//! - `cached`: not forced and every stored row is still fresh; no fetch.
//! - `ok`: the subscription page was fetched and yielded at least one entry,
//!   all of which were upserted with a new expiry.
//! - `error`: the fetch failed, the page had no parsable prices, or the
//!   write failed. Existing rows are left as they were.
//!
//! Batches walk an `(offset, limit)` window of the country list one country
//! at a time. Nothing here serializes two overlapping batches; callers that
//! need that must coordinate themselves.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pspt_core::{
    Country, NewCountry, PriceRecord, PriceStore, PriceUpsert, RefreshStatus, StoreError,
    TtlCache,
};
use pspt_scraper::{extract_prices, parse_discovered_countries, urls, PageFetcher, ScraperError};
use serde::Serialize;
use thiserror::Error;

use crate::{clamp_window, window, PricingError};

pub const DEFAULT_BATCH_LIMIT: usize = 8;
pub const MAX_BATCH_LIMIT: usize = 20;
pub const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const DISCOVERY_CACHE_KEY: &str = "discovery:countries";
const DEFAULT_PRICE_TTL_HOURS: i64 = 6;

/// Outcome of one country refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshResult {
    pub country_id: i64,
    pub iso_code: String,
    pub updated: usize,
    pub status: RefreshStatus,
    pub message: Option<String>,
}

/// A single-country refresh together with the country's rows afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CountryRefresh {
    pub result: RefreshResult,
    pub prices: Vec<PriceRecord>,
}

/// Aggregate of one batch window.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub processed: usize,
    pub next_offset: Option<usize>,
    pub done: bool,
    pub ok: usize,
    pub cached: usize,
    pub failed: usize,
    pub results: Vec<RefreshResult>,
}

/// How a caller names the country to refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    Id(i64),
    Iso(String),
}

impl RefreshTarget {
    /// Prefers the numeric id when both are given; a blank ISO code counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::MissingTarget`] when neither is usable.
    pub fn from_parts(country_id: Option<i64>, iso_code: Option<&str>) -> Result<Self, PricingError> {
        if let Some(id) = country_id {
            return Ok(RefreshTarget::Id(id));
        }
        iso_code
            .map(str::trim)
            .filter(|iso| !iso.is_empty())
            .map(|iso| RefreshTarget::Iso(iso.to_ascii_uppercase()))
            .ok_or(PricingError::MissingTarget)
    }
}

impl std::fmt::Display for RefreshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshTarget::Id(id) => write!(f, "id {id}"),
            RefreshTarget::Iso(iso) => write!(f, "ISO {iso}"),
        }
    }
}

#[derive(Debug, Error)]
enum RefreshFailure {
    #[error(transparent)]
    Fetch(#[from] ScraperError),

    #[error("No parsable price data returned from source")]
    NoParsableData,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct RefreshService {
    store: Arc<dyn PriceStore>,
    fetcher: Arc<dyn PageFetcher>,
    storefront_base: String,
    discovery_url: String,
    price_ttl: chrono::Duration,
    discovered: TtlCache<Vec<NewCountry>>,
}

impl RefreshService {
    #[must_use]
    pub fn new(
        store: Arc<dyn PriceStore>,
        fetcher: Arc<dyn PageFetcher>,
        storefront_base: impl Into<String>,
        discovery_url: impl Into<String>,
        price_ttl: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            storefront_base: storefront_base.into(),
            discovery_url: discovery_url.into(),
            price_ttl: chrono::Duration::from_std(price_ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(DEFAULT_PRICE_TTL_HOURS)),
            discovered: TtlCache::new(DISCOVERY_CACHE_TTL),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn PriceStore> {
        &self.store
    }

    /// Refreshes one country. Never fails: fetch, parse, and write problems
    /// come back as an `error` result. The sync status row is updated after
    /// every attempt.
    pub async fn refresh_country(&self, country: &Country, force: bool) -> RefreshResult {
        let now = Utc::now();

        if !force {
            match self.store.are_country_prices_fresh(country.id, now).await {
                Ok(true) => {
                    tracing::debug!(iso_code = %country.iso_code, "prices still fresh; skipping fetch");
                    let result = RefreshResult {
                        country_id: country.id,
                        iso_code: country.iso_code.clone(),
                        updated: 0,
                        status: RefreshStatus::Cached,
                        message: None,
                    };
                    self.record_sync(&result).await;
                    return result;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(iso_code = %country.iso_code, error = %e, "freshness check failed; refetching");
                }
            }
        }

        let result = match self.fetch_and_store(country, now).await {
            Ok(updated) => {
                tracing::info!(iso_code = %country.iso_code, updated, "prices refreshed");
                RefreshResult {
                    country_id: country.id,
                    iso_code: country.iso_code.clone(),
                    updated,
                    status: RefreshStatus::Ok,
                    message: None,
                }
            }
            Err(failure) => {
                if matches!(failure, RefreshFailure::NoParsableData) {
                    tracing::warn!(iso_code = %country.iso_code, "no parsable price data on page");
                } else {
                    tracing::error!(iso_code = %country.iso_code, error = %failure, "country refresh failed");
                }
                RefreshResult {
                    country_id: country.id,
                    iso_code: country.iso_code.clone(),
                    updated: 0,
                    status: RefreshStatus::Error,
                    message: Some(failure.to_string()),
                }
            }
        };

        self.record_sync(&result).await;
        result
    }

    async fn fetch_and_store(&self, country: &Country, now: DateTime<Utc>) -> Result<usize, RefreshFailure> {
        let url = urls::subscription_page_url(&self.storefront_base, country);
        let html = self.fetcher.fetch_page(&url).await?;

        let entries = extract_prices(&html, &url);
        if entries.is_empty() {
            return Err(RefreshFailure::NoParsableData);
        }

        let cache_expires_at = now.checked_add_signed(self.price_ttl).unwrap_or_else(|| {
            tracing::warn!(
                iso_code = %country.iso_code,
                ttl_secs = self.price_ttl.num_seconds(),
                "price ttl overflows the calendar; rows will not expire"
            );
            DateTime::<Utc>::MAX_UTC
        });
        let rows: Vec<PriceUpsert> = entries
            .into_iter()
            .map(|entry| PriceUpsert {
                country_id: country.id,
                tier: entry.tier,
                duration_months: entry.duration_months,
                currency: entry.currency,
                price: entry.price,
                source_url: entry.source_url,
                last_updated: now,
                cache_expires_at,
            })
            .collect();

        self.store.upsert_prices(&rows).await?;
        Ok(rows.len())
    }

    async fn record_sync(&self, result: &RefreshResult) {
        if let Err(e) = self
            .store
            .upsert_sync_status(result.country_id, result.status, result.message.as_deref())
            .await
        {
            tracing::warn!(iso_code = %result.iso_code, error = %e, "failed to record sync status");
        }
    }

    /// Refreshes a single named country and returns its rows afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::CountryNotFound`] for an unknown target and
    /// [`PricingError::Store`] if the lookup itself fails.
    pub async fn refresh_one(&self, target: &RefreshTarget, force: bool) -> Result<CountryRefresh, PricingError> {
        let country = self.resolve_country(target).await?;
        let result = self.refresh_country(&country, force).await;
        let prices = self.store.get_country_prices(country.id).await?;
        Ok(CountryRefresh { result, prices })
    }

    /// # Errors
    ///
    /// Returns [`PricingError::CountryNotFound`] when nothing matches.
    pub async fn resolve_country(&self, target: &RefreshTarget) -> Result<Country, PricingError> {
        let found = match target {
            RefreshTarget::Id(id) => self.store.get_country_by_id(*id).await?,
            RefreshTarget::Iso(iso) => self.store.get_country_by_iso(iso).await?,
        };
        found.ok_or_else(|| PricingError::CountryNotFound(target.to_string()))
    }

    /// Refreshes the countries in `[offset, offset + limit)`, in list order,
    /// one at a time. `limit` defaults to 8 and is clamped to `[1, 20]`.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Store`] if the country list cannot be loaded.
    /// Per-country failures are reported in `results`, not as an error.
    pub async fn refresh_batch(
        &self,
        force: bool,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<BatchOutcome, PricingError> {
        let started_at = Utc::now();
        let limit = clamp_window(limit, DEFAULT_BATCH_LIMIT, MAX_BATCH_LIMIT);

        self.sync_discovered_countries().await;

        let countries = self.store.list_countries().await?;
        let total = countries.len();

        let mut results = Vec::new();
        for country in window(&countries, offset, limit) {
            results.push(self.refresh_country(country, force).await);
        }

        let processed = results.len();
        let reached = offset.saturating_add(processed);
        let done = reached >= total;
        let count = |status: RefreshStatus| results.iter().filter(|r| r.status == status).count();
        let (ok, cached, failed) = (
            count(RefreshStatus::Ok),
            count(RefreshStatus::Cached),
            count(RefreshStatus::Error),
        );

        tracing::info!(total, offset, processed, ok, cached, failed, "refresh batch complete");

        Ok(BatchOutcome {
            started_at,
            total,
            offset,
            limit,
            processed,
            next_offset: (!done).then_some(reached),
            done,
            ok,
            cached,
            failed,
            results,
        })
    }

    /// Best-effort: pulls the supported-country list from the discovery page
    /// and inserts unknown countries. Failures are logged and swallowed.
    /// Returns the number of countries inserted.
    pub async fn sync_discovered_countries(&self) -> u64 {
        let discovered = if let Some(cached) = self.discovered.get(DISCOVERY_CACHE_KEY) {
            tracing::debug!(count = cached.len(), "discovery list served from cache");
            cached
        } else {
            match self.fetcher.fetch_page(&self.discovery_url).await {
                Ok(html) => {
                    let countries = parse_discovered_countries(&html);
                    if !countries.is_empty() {
                        self.discovered.insert(DISCOVERY_CACHE_KEY, countries.clone());
                    }
                    countries
                }
                Err(e) => {
                    tracing::warn!(url = %self.discovery_url, error = %e, "country discovery failed");
                    return 0;
                }
            }
        };

        if discovered.is_empty() {
            return 0;
        }

        match self.store.insert_countries_if_missing(&discovered).await {
            Ok(inserted) => {
                if inserted > 0 {
                    tracing::info!(inserted, "added newly discovered countries");
                }
                inserted
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to store discovered countries");
                0
            }
        }
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;

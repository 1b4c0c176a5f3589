//! Persistence contract consumed by the refresh pipeline and the API layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::pricing::{
    Country, NewCountry, PriceFilter, PriceListing, PriceRecord, PriceUpsert, RefreshStatus,
    SyncStatusRecord,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("country with ISO code {0} already exists")]
    DuplicateCountry(String),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Country, price, and sync-status storage.
///
/// Implementations must serialize conflicting writes to the same price row;
/// callers do no locking of their own.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// All countries, ordered by name.
    async fn list_countries(&self) -> Result<Vec<Country>, StoreError>;

    async fn get_country_by_id(&self, id: i64) -> Result<Option<Country>, StoreError>;

    /// Case-insensitive lookup by ISO code.
    async fn get_country_by_iso(&self, iso_code: &str) -> Result<Option<Country>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateCountry`] when the ISO code is taken.
    async fn insert_country(&self, country: &NewCountry) -> Result<Country, StoreError>;

    /// Inserts countries whose ISO code is not yet known. Returns the number inserted.
    async fn insert_countries_if_missing(&self, countries: &[NewCountry])
        -> Result<u64, StoreError>;

    /// Deletes a country along with its prices and sync status.
    /// Returns `false` when no such country exists.
    async fn delete_country(&self, id: i64) -> Result<bool, StoreError>;

    async fn list_prices(&self, filter: &PriceFilter) -> Result<Vec<PriceListing>, StoreError>;

    async fn get_country_prices(&self, country_id: i64) -> Result<Vec<PriceRecord>, StoreError>;

    /// `true` iff the country has at least one price row and every row's
    /// `cache_expires_at` is later than `now`.
    async fn are_country_prices_fresh(
        &self,
        country_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Upserts rows keyed by `(country_id, tier, duration_months)`. Returns rows written.
    async fn upsert_prices(&self, prices: &[PriceUpsert]) -> Result<u64, StoreError>;

    async fn upsert_sync_status(
        &self,
        country_id: i64,
        status: RefreshStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn get_sync_status(&self, country_id: i64)
        -> Result<Option<SyncStatusRecord>, StoreError>;

    async fn count_prices(&self) -> Result<i64, StoreError>;
}

//! [`PriceStore`] backed by Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pspt_core::{
    Country, NewCountry, PriceFilter, PriceListing, PriceRecord, PriceStore, PriceUpsert,
    RefreshStatus, StoreError, SyncStatusRecord,
};
use sqlx::PgPool;

use crate::{countries, prices, sync_status, DbError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateCountry(iso) => StoreError::DuplicateCountry(iso),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn list_countries(&self) -> Result<Vec<Country>, StoreError> {
        let rows = countries::list_countries(&self.pool).await?;
        Ok(rows.into_iter().map(Country::from).collect())
    }

    async fn get_country_by_id(&self, id: i64) -> Result<Option<Country>, StoreError> {
        Ok(countries::get_country_by_id(&self.pool, id)
            .await?
            .map(Country::from))
    }

    async fn get_country_by_iso(&self, iso_code: &str) -> Result<Option<Country>, StoreError> {
        Ok(countries::get_country_by_iso(&self.pool, iso_code)
            .await?
            .map(Country::from))
    }

    async fn insert_country(&self, country: &NewCountry) -> Result<Country, StoreError> {
        Ok(countries::insert_country(&self.pool, country).await?.into())
    }

    async fn insert_countries_if_missing(
        &self,
        new_countries: &[NewCountry],
    ) -> Result<u64, StoreError> {
        Ok(countries::insert_countries_if_missing(&self.pool, new_countries).await?)
    }

    async fn delete_country(&self, id: i64) -> Result<bool, StoreError> {
        Ok(countries::delete_country(&self.pool, id).await?)
    }

    async fn list_prices(&self, filter: &PriceFilter) -> Result<Vec<PriceListing>, StoreError> {
        let rows = prices::list_prices(&self.pool, filter).await?;
        let listings = rows
            .into_iter()
            .map(PriceListing::try_from)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(listings)
    }

    async fn get_country_prices(&self, country_id: i64) -> Result<Vec<PriceRecord>, StoreError> {
        let rows = prices::get_country_prices(&self.pool, country_id).await?;
        let records = rows
            .into_iter()
            .map(PriceRecord::try_from)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(records)
    }

    async fn are_country_prices_fresh(
        &self,
        country_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(prices::are_country_prices_fresh(&self.pool, country_id, now).await?)
    }

    async fn upsert_prices(&self, rows: &[PriceUpsert]) -> Result<u64, StoreError> {
        Ok(prices::upsert_prices(&self.pool, rows).await?)
    }

    async fn upsert_sync_status(
        &self,
        country_id: i64,
        status: RefreshStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        Ok(sync_status::upsert_sync_status(&self.pool, country_id, status, error_message).await?)
    }

    async fn get_sync_status(
        &self,
        country_id: i64,
    ) -> Result<Option<SyncStatusRecord>, StoreError> {
        let row = sync_status::get_sync_status(&self.pool, country_id).await?;
        Ok(row.map(SyncStatusRecord::try_from).transpose()?)
    }

    async fn count_prices(&self) -> Result<i64, StoreError> {
        Ok(prices::count_prices(&self.pool).await?)
    }
}

//! Database operations for the `prices` table.

use chrono::{DateTime, Utc};
use pspt_core::{
    DurationMonths, PriceFilter, PriceListing, PriceRecord, PriceSortKey, PriceUpsert,
    SortDirection, Tier,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `prices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    pub id: i64,
    pub country_id: i64,
    pub tier: String,
    pub duration_months: i16,
    pub currency: String,
    pub price: Decimal,
    pub source_url: String,
    pub last_updated: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
}

/// A price row joined with its country's name and ISO code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceListingRow {
    pub id: i64,
    pub country_id: i64,
    pub country_name: String,
    pub iso_code: String,
    pub tier: String,
    pub duration_months: i16,
    pub currency: String,
    pub price: Decimal,
    pub source_url: String,
    pub last_updated: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
}

fn decode_plan(tier: &str, duration_months: i16) -> Result<(Tier, DurationMonths), DbError> {
    let tier = tier
        .parse::<Tier>()
        .map_err(|e| DbError::InvalidRow(e.to_string()))?;
    let duration = DurationMonths::from_months(i64::from(duration_months)).ok_or_else(|| {
        DbError::InvalidRow(format!("duration_months {duration_months} is not 1, 3 or 12"))
    })?;
    Ok((tier, duration))
}

impl TryFrom<PriceRow> for PriceRecord {
    type Error = DbError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let (tier, duration_months) = decode_plan(&row.tier, row.duration_months)?;
        Ok(PriceRecord {
            id: row.id,
            country_id: row.country_id,
            tier,
            duration_months,
            currency: row.currency,
            price: row.price,
            source_url: row.source_url,
            last_updated: row.last_updated,
            cache_expires_at: row.cache_expires_at,
        })
    }
}

impl TryFrom<PriceListingRow> for PriceListing {
    type Error = DbError;

    fn try_from(row: PriceListingRow) -> Result<Self, Self::Error> {
        let (tier, duration_months) = decode_plan(&row.tier, row.duration_months)?;
        Ok(PriceListing {
            id: row.id,
            country_id: row.country_id,
            country_name: row.country_name,
            iso_code: row.iso_code,
            tier,
            duration_months,
            currency: row.currency,
            price: row.price,
            source_url: row.source_url,
            last_updated: row.last_updated,
            cache_expires_at: row.cache_expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn order_by(sort_by: PriceSortKey, dir: SortDirection) -> String {
    let column = match sort_by {
        PriceSortKey::Price => "p.price",
        PriceSortKey::Country => "c.name",
        PriceSortKey::LastUpdated => "p.last_updated",
    };
    let dir = match dir {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!("{column} {dir}, c.name ASC, p.tier ASC, p.duration_months ASC")
}

/// Escapes `LIKE` wildcards so user search text matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Lists stored prices joined with their country, filtered and sorted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored tier or duration is outside the known sets.
pub async fn list_prices(
    pool: &PgPool,
    filter: &PriceFilter,
) -> Result<Vec<PriceListingRow>, DbError> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let sql = format!(
        "SELECT p.id, p.country_id, c.name AS country_name, c.iso_code, p.tier, \
                p.duration_months, p.currency, p.price, p.source_url, p.last_updated, \
                p.cache_expires_at \
         FROM prices p \
         JOIN countries c ON c.id = p.country_id \
         WHERE ($1::TEXT IS NULL OR c.iso_code = UPPER($1)) \
           AND ($2::TEXT IS NULL OR UPPER(p.currency) = UPPER($2)) \
           AND ($3::TEXT IS NULL OR p.tier = $3) \
           AND ($4::SMALLINT IS NULL OR p.duration_months = $4) \
           AND ($5::TEXT IS NULL \
                OR c.name ILIKE $5 OR c.iso_code ILIKE $5 \
                OR p.currency ILIKE $5 OR p.tier ILIKE $5) \
         ORDER BY {}",
        order_by(filter.sort_by, filter.sort_dir)
    );

    let rows = sqlx::query_as::<_, PriceListingRow>(&sql)
        .bind(filter.country.as_deref().map(str::trim))
        .bind(filter.currency.as_deref().map(str::trim))
        .bind(filter.tier.map(Tier::as_str))
        .bind(filter.duration.map(|d| i16::from(d.months())))
        .bind(search)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_country_prices(pool: &PgPool, country_id: i64) -> Result<Vec<PriceRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceRow>(
        "SELECT id, country_id, tier, duration_months, currency, price, source_url, \
                last_updated, cache_expires_at \
         FROM prices \
         WHERE country_id = $1 \
         ORDER BY tier, duration_months",
    )
    .bind(country_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// `true` when the country has at least one price row and the earliest
/// `cache_expires_at` is still after `now`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn are_country_prices_fresh(
    pool: &PgPool,
    country_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, DbError> {
    let (count, earliest): (i64, Option<DateTime<Utc>>) = sqlx::query_as(
        "SELECT COUNT(*), MIN(cache_expires_at) FROM prices WHERE country_id = $1",
    )
    .bind(country_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0 && earliest.is_some_and(|expires| expires > now))
}

/// Upserts price rows keyed by `(country_id, tier, duration_months)` in one
/// transaction. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the batch is rolled back.
pub async fn upsert_prices(pool: &PgPool, prices: &[PriceUpsert]) -> Result<u64, DbError> {
    if prices.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0u64;

    for price in prices {
        let result = sqlx::query(
            "INSERT INTO prices \
                 (country_id, tier, duration_months, currency, price, source_url, \
                  last_updated, cache_expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (country_id, tier, duration_months) DO UPDATE SET \
                 currency = EXCLUDED.currency, \
                 price = EXCLUDED.price, \
                 source_url = EXCLUDED.source_url, \
                 last_updated = EXCLUDED.last_updated, \
                 cache_expires_at = EXCLUDED.cache_expires_at",
        )
        .bind(price.country_id)
        .bind(price.tier.as_str())
        .bind(i16::from(price.duration_months.months()))
        .bind(&price.currency)
        .bind(price.price)
        .bind(&price.source_url)
        .bind(price.last_updated)
        .bind(price.cache_expires_at)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_prices(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM prices")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_maps_keys_to_columns() {
        assert_eq!(
            order_by(PriceSortKey::Price, SortDirection::Desc),
            "p.price DESC, c.name ASC, p.tier ASC, p.duration_months ASC"
        );
        assert!(order_by(PriceSortKey::LastUpdated, SortDirection::Asc).starts_with("p.last_updated ASC"));
        assert!(order_by(PriceSortKey::Country, SortDirection::Asc).starts_with("c.name ASC"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("sa"), "%sa%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn decode_plan_rejects_unknown_values() {
        assert!(decode_plan("Premium", 12).is_ok());
        assert!(matches!(decode_plan("Gold", 12), Err(DbError::InvalidRow(_))));
        assert!(matches!(decode_plan("Extra", 6), Err(DbError::InvalidRow(_))));
    }
}

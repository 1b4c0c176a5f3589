//! Database operations for the `countries` table.

use chrono::{DateTime, Utc};
use pspt_core::{Country, NewCountry};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `countries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryRow {
    pub id: i64,
    pub name: String,
    pub iso_code: String,
    pub region_identifier: String,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CountryRow> for Country {
    fn from(row: CountryRow) -> Self {
        Country {
            id: row.id,
            name: row.name,
            iso_code: row.iso_code,
            region_identifier: row.region_identifier,
            source_url: row.source_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COUNTRY_COLUMNS: &str =
    "id, name, iso_code, region_identifier, source_url, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all countries, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_countries(pool: &PgPool) -> Result<Vec<CountryRow>, DbError> {
    let rows = sqlx::query_as::<_, CountryRow>(&format!(
        "SELECT {COUNTRY_COLUMNS} FROM countries ORDER BY name, iso_code"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_country_by_id(pool: &PgPool, id: i64) -> Result<Option<CountryRow>, DbError> {
    let row = sqlx::query_as::<_, CountryRow>(&format!(
        "SELECT {COUNTRY_COLUMNS} FROM countries WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Case-insensitive lookup by ISO code.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_country_by_iso(
    pool: &PgPool,
    iso_code: &str,
) -> Result<Option<CountryRow>, DbError> {
    let row = sqlx::query_as::<_, CountryRow>(&format!(
        "SELECT {COUNTRY_COLUMNS} FROM countries WHERE iso_code = UPPER($1)"
    ))
    .bind(iso_code.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a single country.
///
/// # Errors
///
/// Returns [`DbError::DuplicateCountry`] if the ISO code already exists, or
/// [`DbError::Sqlx`] for any other failure.
pub async fn insert_country(pool: &PgPool, country: &NewCountry) -> Result<CountryRow, DbError> {
    sqlx::query_as::<_, CountryRow>(&format!(
        "INSERT INTO countries (name, iso_code, region_identifier, source_url) \
         VALUES ($1, UPPER($2), LOWER($3), $4) \
         RETURNING {COUNTRY_COLUMNS}"
    ))
    .bind(&country.name)
    .bind(&country.iso_code)
    .bind(&country.region_identifier)
    .bind(&country.source_url)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if DbError::is_unique_violation(&e) {
            DbError::DuplicateCountry(country.iso_code.to_uppercase())
        } else {
            DbError::Sqlx(e)
        }
    })
}

/// Inserts countries whose ISO code is not yet present, in one transaction.
///
/// Returns the number of rows actually inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the batch is rolled back.
pub async fn insert_countries_if_missing(
    pool: &PgPool,
    countries: &[NewCountry],
) -> Result<u64, DbError> {
    if countries.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for country in countries {
        let result = sqlx::query(
            "INSERT INTO countries (name, iso_code, region_identifier, source_url) \
             VALUES ($1, UPPER($2), LOWER($3), $4) \
             ON CONFLICT (iso_code) DO NOTHING",
        )
        .bind(&country.name)
        .bind(&country.iso_code)
        .bind(&country.region_identifier)
        .bind(&country.source_url)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Deletes a country; its prices and sync status go with it via `ON DELETE CASCADE`.
///
/// Returns `false` if no row matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_country(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM countries WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

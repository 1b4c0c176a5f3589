use pspt_core::NewCountry;
use sqlx::PgPool;

use crate::DbError;

/// Upserts seed countries by ISO code, refreshing name, region and source URL.
///
/// Returns the number of countries processed. All upserts run inside a single
/// transaction; if any fails the batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_countries(pool: &PgPool, countries: &[NewCountry]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for country in countries {
        sqlx::query(
            "INSERT INTO countries (name, iso_code, region_identifier, source_url) \
             VALUES ($1, UPPER($2), LOWER($3), $4) \
             ON CONFLICT (iso_code) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 region_identifier = EXCLUDED.region_identifier, \
                 source_url = EXCLUDED.source_url, \
                 updated_at = NOW()",
        )
        .bind(&country.name)
        .bind(&country.iso_code)
        .bind(&country.region_identifier)
        .bind(&country.source_url)
        .execute(&mut *tx)
        .await?;
        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

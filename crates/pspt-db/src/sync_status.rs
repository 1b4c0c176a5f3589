//! Database operations for the `sync_status` table.

use chrono::{DateTime, Utc};
use pspt_core::{RefreshStatus, SyncStatusRecord};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `sync_status` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncStatusRow {
    pub country_id: i64,
    pub status: String,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SyncStatusRow> for SyncStatusRecord {
    type Error = DbError;

    fn try_from(row: SyncStatusRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RefreshStatus>()
            .map_err(|e| DbError::InvalidRow(e.to_string()))?;
        Ok(SyncStatusRecord {
            country_id: row.country_id,
            status,
            error_message: row.error_message,
            updated_at: row.updated_at,
        })
    }
}

/// Records the outcome of the latest refresh attempt for a country.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_sync_status(
    pool: &PgPool,
    country_id: i64,
    status: RefreshStatus,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_status (country_id, status, error_message, updated_at) \
         VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (country_id) DO UPDATE SET \
             status = EXCLUDED.status, \
             error_message = EXCLUDED.error_message, \
             updated_at = EXCLUDED.updated_at",
    )
    .bind(country_id)
    .bind(status.as_str())
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_status(
    pool: &PgPool,
    country_id: i64,
) -> Result<Option<SyncStatusRow>, DbError> {
    let row = sqlx::query_as::<_, SyncStatusRow>(
        "SELECT country_id, status, error_message, updated_at \
         FROM sync_status WHERE country_id = $1",
    )
    .bind(country_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

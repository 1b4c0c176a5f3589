use std::collections::HashSet;
use std::time::Duration;

use pspt_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod countries;
pub mod prices;
pub mod seed;
pub mod store;
pub mod sync_status;

pub use countries::{
    delete_country, get_country_by_id, get_country_by_iso, insert_countries_if_missing,
    insert_country, list_countries, CountryRow,
};
pub use prices::{
    are_country_prices_fresh, count_prices, get_country_prices, list_prices, upsert_prices,
    PriceListingRow, PriceRow,
};
pub use seed::seed_countries;
pub use store::PgPriceStore;
pub use sync_status::{get_sync_status, upsert_sync_status, SyncStatusRow};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing for the tracker's Postgres connection.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections.min(config.db_max_connections),
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("country with ISO code {0} already exists")]
    DuplicateCountry(String),
    /// A stored value falls outside the domain's closed sets.
    #[error("invalid stored value: {0}")]
    InvalidRow(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
    }
}

/// Opens the tracker's connection pool.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be established within the
/// acquire timeout.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max = config.max_connections,
        min = config.min_connections,
        "opening database pool"
    );
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Applies the bundled schema migrations and returns how many were new.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails or a recorded
/// checksum no longer matches its file.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    // A fresh database has no bookkeeping table yet; nothing is applied.
    let applied: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .map(|versions| versions.into_iter().collect())
            .unwrap_or_default();

    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count();

    MIGRATOR.run(pool).await?;
    tracing::info!(pending, "schema migrations applied");
    Ok(pending)
}

/// Round-trips a trivial query to prove the pool can reach Postgres.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

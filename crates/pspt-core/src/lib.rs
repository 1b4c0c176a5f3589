pub mod app_config;
pub mod cache;
pub mod config;
pub mod countries;
pub mod pricing;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use cache::TtlCache;
pub use config::{load_app_config, load_app_config_from_env, MAX_PRICE_TTL_SECS};
pub use countries::{load_countries, CountriesFile, CountrySeed};
pub use pricing::{
    Country, DurationMonths, NewCountry, ParsedPriceEntry, PriceFilter, PriceListing,
    PriceRecord, PriceSortKey, PriceUpsert, RefreshStatus, SortDirection, SyncStatusRecord, Tier,
};
pub use store::{PriceStore, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read countries file {path}: {source}")]
    CountriesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse countries file: {0}")]
    CountriesFileParse(#[from] serde_yaml::Error),

    #[error("countries validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("invalid duration: {0} months")]
    InvalidDuration(i64),

    #[error("invalid refresh status: {0}")]
    InvalidRefreshStatus(String),
}

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub countries_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// How long a freshly scraped price row stays fresh before a refresh refetches it.
    pub price_ttl_secs: u64,
    pub fetch_retry_count: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub reference_currency: String,
    pub storefront_base_url: String,
    pub store_base_url: String,
    pub discovery_url: String,
    pub currency_api_base_url: String,
    pub fx_api_base_url: String,
    /// Cron expression for the scheduled stale-only refresh; `None` disables it.
    pub refresh_cron: Option<String>,
    pub job_retention_max: usize,
    pub job_retention_secs: u64,
    pub rate_limit_per_minute: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("countries_path", &self.countries_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("price_ttl_secs", &self.price_ttl_secs)
            .field("fetch_retry_count", &self.fetch_retry_count)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("reference_currency", &self.reference_currency)
            .field("storefront_base_url", &self.storefront_base_url)
            .field("store_base_url", &self.store_base_url)
            .field("discovery_url", &self.discovery_url)
            .field("currency_api_base_url", &self.currency_api_base_url)
            .field("fx_api_base_url", &self.fx_api_base_url)
            .field("refresh_cron", &self.refresh_cron)
            .field("job_retention_max", &self.job_retention_max)
            .field("job_retention_secs", &self.job_retention_secs)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

//! Wires the pricing services from configuration around a given store.

use std::sync::Arc;
use std::time::Duration;

use pspt_core::{AppConfig, PriceStore};
use pspt_fx::{CurrencyResolver, CurrencySource, FxService, RateSource};
use pspt_scraper::{PageFetcher, StorefrontClient};

use crate::{GamePriceSearch, JobRetention, JobTracker, PricingError, QuoteService, RefreshService};

/// Every long-lived pricing service, sharing one page fetcher and one set of
/// currency and FX caches.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn PriceStore>,
    pub refresh: Arc<RefreshService>,
    pub jobs: Arc<JobTracker>,
    pub quotes: Arc<QuoteService>,
    pub games: Arc<GamePriceSearch>,
}

impl Services {
    /// # Errors
    ///
    /// Returns [`PricingError::Scraper`] or [`PricingError::Fx`] if an HTTP
    /// client cannot be built or a configured base URL is invalid.
    pub fn from_config(config: &AppConfig, store: Arc<dyn PriceStore>) -> Result<Self, PricingError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(StorefrontClient::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.fetch_retry_count,
            config.retry_backoff_ms,
        )?);
        let currencies: Arc<dyn CurrencySource> = Arc::new(CurrencyResolver::new(
            config.request_timeout_secs,
            &config.user_agent,
            &config.currency_api_base_url,
            config.retry_backoff_ms,
        )?);
        let rates: Arc<dyn RateSource> = Arc::new(FxService::new(
            config.request_timeout_secs,
            &config.user_agent,
            &config.fx_api_base_url,
            &config.reference_currency,
            config.retry_backoff_ms,
        )?);

        let refresh = Arc::new(RefreshService::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            config.storefront_base_url.clone(),
            config.discovery_url.clone(),
            Duration::from_secs(config.price_ttl_secs),
        ));
        let jobs = Arc::new(JobTracker::new(
            Arc::clone(&refresh),
            JobRetention::new(config.job_retention_max, config.job_retention_secs),
        ));
        let quotes = Arc::new(QuoteService::new(Arc::clone(&currencies), Arc::clone(&rates)));
        let games = Arc::new(GamePriceSearch::new(
            Arc::clone(&store),
            fetcher,
            currencies,
            rates,
            config.store_base_url.clone(),
        ));

        Ok(Self {
            store,
            refresh,
            jobs,
            quotes,
            games,
        })
    }
}

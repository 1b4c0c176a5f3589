use pspt_core::StoreError;
use pspt_fx::FxError;
use pspt_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("country not found: {0}")]
    CountryNotFound(String),

    #[error("a country id or ISO code is required")]
    MissingTarget,

    #[error("game name is required")]
    EmptyQuery,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("storefront client setup failed: {0}")]
    Scraper(#[from] ScraperError),

    #[error("exchange-rate client setup failed: {0}")]
    Fx(#[from] FxError),
}

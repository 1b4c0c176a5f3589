//! Game price lookup across a window of country storefronts.

use std::sync::Arc;

use futures::future::join_all;
use pspt_core::{Country, PriceStore};
use pspt_fx::{normalize_storefront_currency, CurrencySource, RateSource};
use pspt_scraper::{best_match, urls, PageFetcher};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{clamp_window, round_money, window, PricingError};

pub const DEFAULT_SEARCH_LIMIT: usize = 6;
pub const MAX_SEARCH_LIMIT: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GamePriceRecord {
    pub country_id: i64,
    pub country_name: String,
    pub iso_code: String,
    pub game_name: String,
    pub poster_url: Option<String>,
    pub product_type: String,
    pub product_id: String,
    pub currency: Option<String>,
    pub amount: Option<Decimal>,
    pub display_price: String,
    pub sar_price: Option<Decimal>,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSearchMeta {
    pub query: String,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub processed: usize,
    pub next_offset: Option<usize>,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSearchOutcome {
    pub records: Vec<GamePriceRecord>,
    pub meta: GameSearchMeta,
}

pub struct GamePriceSearch {
    store: Arc<dyn PriceStore>,
    fetcher: Arc<dyn PageFetcher>,
    currencies: Arc<dyn CurrencySource>,
    rates: Arc<dyn RateSource>,
    store_base: String,
}

impl GamePriceSearch {
    #[must_use]
    pub fn new(
        store: Arc<dyn PriceStore>,
        fetcher: Arc<dyn PageFetcher>,
        currencies: Arc<dyn CurrencySource>,
        rates: Arc<dyn RateSource>,
        store_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            fetcher,
            currencies,
            rates,
            store_base: store_base.into(),
        }
    }

    /// Searches the storefronts of countries `[offset, offset + limit)`
    /// concurrently. Countries whose page fails or has no purchasable match
    /// are left out of `records`.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::EmptyQuery`] for a blank query and
    /// [`PricingError::Store`] if the country list cannot be loaded.
    pub async fn search(
        &self,
        query: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<GameSearchOutcome, PricingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PricingError::EmptyQuery);
        }
        let limit = clamp_window(limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

        let countries = self.store.list_countries().await?;
        let total = countries.len();
        let slice = window(&countries, offset, limit);

        let found = join_all(slice.iter().map(|country| self.search_country(country, query))).await;
        let records: Vec<GamePriceRecord> = found.into_iter().flatten().collect();

        let processed = slice.len();
        let reached = offset.saturating_add(processed);
        let done = reached >= total;

        tracing::info!(query, total, offset, processed, found = records.len(), "game search window complete");

        Ok(GameSearchOutcome {
            records,
            meta: GameSearchMeta {
                query: query.to_string(),
                total,
                offset,
                limit,
                processed,
                next_offset: (!done).then_some(reached),
                done,
            },
        })
    }

    async fn search_country(&self, country: &Country, query: &str) -> Option<GamePriceRecord> {
        let url = urls::search_url(&self.store_base, &country.region_identifier, query);
        let cache_key = format!("game-search:{}:{}", country.iso_code, query.to_lowercase());

        let html = match self.fetcher.fetch_page_keyed(&cache_key, &url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(iso_code = %country.iso_code, error = %e, "game search page failed");
                return None;
            }
        };

        let local = self.currencies.local_currencies(&country.iso_code).await;
        let Some(found) = best_match(&html, query, local.first().map(String::as_str)) else {
            tracing::debug!(iso_code = %country.iso_code, query, "no purchasable match");
            return None;
        };

        let currency = found
            .currency
            .as_deref()
            .map(|c| normalize_storefront_currency(&country.iso_code, c));
        let sar_price = match (found.amount, currency.as_deref()) {
            (Some(amount), Some(code)) => self
                .rates
                .rate_to_reference(code)
                .await
                .map(|rate| round_money(amount * rate)),
            _ => None,
        };

        Some(GamePriceRecord {
            country_id: country.id,
            country_name: country.name.clone(),
            iso_code: country.iso_code.clone(),
            game_name: found.name,
            poster_url: found.poster_url,
            product_type: found.product_type,
            source_url: urls::product_url(&self.store_base, &country.region_identifier, &found.product_id),
            product_id: found.product_id,
            currency,
            amount: found.amount,
            display_price: found.display_price,
            sar_price,
        })
    }
}

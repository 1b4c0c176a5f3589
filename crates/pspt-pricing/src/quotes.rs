//! Presents stored prices in the reference currency.
//!
//! A storefront may bill in a currency other than the country's own (for
//! example USD in a country whose currency is something else). For such rows
//! the reference price is computed through an estimated local price first,
//! falling back to a direct conversion when that chain is incomplete.

use std::collections::HashMap;
use std::sync::Arc;

use pspt_core::PriceListing;
use pspt_fx::{normalize_storefront_currency, CurrencySource, RateSource};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::round_money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedRow {
    #[serde(flatten)]
    pub listing: PriceListing,
    pub sar_price: Option<Decimal>,
    pub is_local_currency: bool,
    pub local_currency_codes: Vec<String>,
    pub local_estimated_price: Option<Decimal>,
}

pub struct QuoteService {
    currencies: Arc<dyn CurrencySource>,
    rates: Arc<dyn RateSource>,
}

/// Per-call memo so each country and currency pair is looked up once.
#[derive(Default)]
struct Lookups {
    currencies: HashMap<String, Vec<String>>,
    rates: HashMap<(String, String), Option<Decimal>>,
}

impl QuoteService {
    #[must_use]
    pub fn new(currencies: Arc<dyn CurrencySource>, rates: Arc<dyn RateSource>) -> Self {
        Self { currencies, rates }
    }

    #[must_use]
    pub fn reference_currency(&self) -> &str {
        self.rates.reference_currency()
    }

    pub async fn present(&self, rows: Vec<PriceListing>) -> Vec<PricedRow> {
        let mut lookups = Lookups::default();
        let mut priced = Vec::with_capacity(rows.len());
        for row in rows {
            priced.push(self.present_row(row, &mut lookups).await);
        }
        priced
    }

    async fn present_row(&self, mut listing: PriceListing, lookups: &mut Lookups) -> PricedRow {
        listing.currency = normalize_storefront_currency(&listing.iso_code, &listing.currency);
        let reference = self.reference_currency().to_string();

        let local_codes = self.local_currencies(&listing.iso_code, lookups).await;
        let is_local_currency =
            local_codes.is_empty() || local_codes.iter().any(|c| *c == listing.currency);

        let sar_from_source = self
            .rate(&listing.currency, &reference, lookups)
            .await
            .map(|rate| round_money(listing.price * rate));

        let mut local_estimated_price = None;
        let mut sar_price = sar_from_source;

        if let (false, Some(local)) = (is_local_currency, local_codes.first()) {
            local_estimated_price = self
                .rate(&listing.currency, local, lookups)
                .await
                .map(|rate| round_money(listing.price * rate));

            if let Some(estimate) = local_estimated_price {
                let sar_from_local = self
                    .rate(local, &reference, lookups)
                    .await
                    .map(|rate| round_money(estimate * rate));
                sar_price = sar_from_local.or(sar_from_source);
            }
        }

        PricedRow {
            listing,
            sar_price,
            is_local_currency,
            local_currency_codes: local_codes,
            local_estimated_price,
        }
    }

    async fn local_currencies(&self, iso_code: &str, lookups: &mut Lookups) -> Vec<String> {
        if let Some(codes) = lookups.currencies.get(iso_code) {
            return codes.clone();
        }
        let codes = self.currencies.local_currencies(iso_code).await;
        lookups.currencies.insert(iso_code.to_string(), codes.clone());
        codes
    }

    async fn rate(&self, from: &str, to: &str, lookups: &mut Lookups) -> Option<Decimal> {
        let key = (from.to_string(), to.to_string());
        if let Some(rate) = lookups.rates.get(&key) {
            return *rate;
        }
        let rate = self.rates.rate(from, to).await;
        lookups.rates.insert(key, rate);
        rate
    }
}

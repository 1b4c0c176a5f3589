//! In-memory fakes shared by this crate's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pspt_core::{
    Country, NewCountry, PriceFilter, PriceListing, PriceRecord, PriceStore, PriceUpsert,
    RefreshStatus, StoreError, SyncStatusRecord,
};
use pspt_fx::{CurrencySource, RateSource};
use pspt_scraper::{PageFetcher, ScraperError};
use rust_decimal::Decimal;

pub(crate) fn country(id: i64, name: &str, iso: &str, region: &str) -> Country {
    Country {
        id,
        name: name.to_string(),
        iso_code: iso.to_string(),
        region_identifier: region.to_string(),
        source_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct StoreState {
    countries: Vec<Country>,
    prices: Vec<PriceRecord>,
    sync: HashMap<i64, SyncStatusRecord>,
    next_price_id: i64,
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub(crate) state: Mutex<StoreState>,
    pub fail_listing: bool,
    pub panic_on_listing: bool,
    pub fail_upserts: bool,
}

fn backend(msg: &str) -> StoreError {
    StoreError::Backend(msg.to_string().into())
}

impl FakeStore {
    pub(crate) fn with_countries(countries: Vec<Country>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().countries = countries;
        store
    }

    pub(crate) fn prices_for(&self, country_id: i64) -> Vec<PriceRecord> {
        let state = self.state.lock().unwrap();
        state
            .prices
            .iter()
            .filter(|p| p.country_id == country_id)
            .cloned()
            .collect()
    }

    pub(crate) fn sync_for(&self, country_id: i64) -> Option<SyncStatusRecord> {
        self.state.lock().unwrap().sync.get(&country_id).cloned()
    }

    pub(crate) fn country_isos(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.countries.iter().map(|c| c.iso_code.clone()).collect()
    }

    /// Seeds a stored row as given.
    pub(crate) fn put_price(&self, row: PriceUpsert) {
        let mut state = self.state.lock().unwrap();
        state.next_price_id += 1;
        let id = state.next_price_id;
        state.prices.push(PriceRecord {
            id,
            country_id: row.country_id,
            tier: row.tier,
            duration_months: row.duration_months,
            currency: row.currency,
            price: row.price,
            source_url: row.source_url,
            last_updated: row.last_updated,
            cache_expires_at: row.cache_expires_at,
        });
    }
}

#[async_trait]
impl PriceStore for FakeStore {
    async fn list_countries(&self) -> Result<Vec<Country>, StoreError> {
        if self.fail_listing {
            return Err(backend("connection refused"));
        }
        assert!(!self.panic_on_listing, "country listing crashed");
        let mut countries = self.state.lock().unwrap().countries.clone();
        countries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(countries)
    }

    async fn get_country_by_id(&self, id: i64) -> Result<Option<Country>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.countries.iter().find(|c| c.id == id).cloned())
    }

    async fn get_country_by_iso(&self, iso_code: &str) -> Result<Option<Country>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .countries
            .iter()
            .find(|c| c.iso_code.eq_ignore_ascii_case(iso_code))
            .cloned())
    }

    async fn insert_country(&self, country: &NewCountry) -> Result<Country, StoreError> {
        let mut state = self.state.lock().unwrap();
        let iso = country.iso_code.to_ascii_uppercase();
        if state.countries.iter().any(|c| c.iso_code == iso) {
            return Err(StoreError::DuplicateCountry(iso));
        }
        let id = state.countries.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let created = Country {
            source_url: country.source_url.clone(),
            ..crate::testing::country(id, &country.name, &iso, &country.region_identifier)
        };
        state.countries.push(created.clone());
        Ok(created)
    }

    async fn insert_countries_if_missing(&self, countries: &[NewCountry]) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for country in countries {
            match self.insert_country(country).await {
                Ok(_) => inserted += 1,
                Err(StoreError::DuplicateCountry(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(inserted)
    }

    async fn delete_country(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let before = state.countries.len();
        state.countries.retain(|c| c.id != id);
        state.prices.retain(|p| p.country_id != id);
        state.sync.remove(&id);
        Ok(state.countries.len() != before)
    }

    async fn list_prices(&self, _filter: &PriceFilter) -> Result<Vec<PriceListing>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .prices
            .iter()
            .filter_map(|p| {
                let country = state.countries.iter().find(|c| c.id == p.country_id)?;
                Some(PriceListing {
                    id: p.id,
                    country_id: p.country_id,
                    country_name: country.name.clone(),
                    iso_code: country.iso_code.clone(),
                    tier: p.tier,
                    duration_months: p.duration_months,
                    currency: p.currency.clone(),
                    price: p.price,
                    source_url: p.source_url.clone(),
                    last_updated: p.last_updated,
                    cache_expires_at: p.cache_expires_at,
                })
            })
            .collect())
    }

    async fn get_country_prices(&self, country_id: i64) -> Result<Vec<PriceRecord>, StoreError> {
        Ok(self.prices_for(country_id))
    }

    async fn are_country_prices_fresh(
        &self,
        country_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let rows = self.prices_for(country_id);
        Ok(!rows.is_empty() && rows.iter().all(|p| p.cache_expires_at > now))
    }

    async fn upsert_prices(&self, prices: &[PriceUpsert]) -> Result<u64, StoreError> {
        if self.fail_upserts {
            return Err(backend("write rejected"));
        }
        for row in prices {
            {
                let mut state = self.state.lock().unwrap();
                state.prices.retain(|p| {
                    !(p.country_id == row.country_id
                        && p.tier == row.tier
                        && p.duration_months == row.duration_months)
                });
            }
            self.put_price(row.clone());
        }
        Ok(prices.len() as u64)
    }

    async fn upsert_sync_status(
        &self,
        country_id: i64,
        status: RefreshStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.state.lock().unwrap().sync.insert(
            country_id,
            SyncStatusRecord {
                country_id,
                status,
                error_message: error_message.map(ToOwned::to_owned),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_sync_status(&self, country_id: i64) -> Result<Option<SyncStatusRecord>, StoreError> {
        Ok(self.sync_for(country_id))
    }

    async fn count_prices(&self) -> Result<i64, StoreError> {
        Ok(self.state.lock().unwrap().prices.len() as i64)
    }
}

// ---------------------------------------------------------------------------
// Page fetcher
// ---------------------------------------------------------------------------

/// Serves canned pages by URL; unknown URLs are a 404. Counts every call.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    pages: HashMap<String, String>,
    failing: HashMap<String, u16>,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub(crate) fn failing(mut self, url: &str, status: u16) -> Self {
        self.failing.insert(url.to_string(), status);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page_keyed(&self, cache_key: &str, url: &str) -> Result<String, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().unwrap().push(cache_key.to_string());
        if let Some(&status) = self.failing.get(url) {
            return Err(ScraperError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::NotFound { url: url.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Currency and FX sources
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeCurrencies {
    by_iso: HashMap<String, Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeCurrencies {
    pub(crate) fn with(mut self, iso: &str, codes: &[&str]) -> Self {
        self.by_iso
            .insert(iso.to_string(), codes.iter().map(ToString::to_string).collect());
        self
    }
}

#[async_trait]
impl CurrencySource for FakeCurrencies {
    async fn local_currencies(&self, iso_code: &str) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.by_iso.get(iso_code).cloned().unwrap_or_default()
    }
}

pub(crate) struct FakeRates {
    rates: HashMap<(String, String), Decimal>,
    pub calls: AtomicUsize,
}

impl FakeRates {
    pub(crate) fn new() -> Self {
        Self {
            rates: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates.insert((from.to_string(), to.to_string()), rate);
        self
    }
}

#[async_trait]
impl RateSource for FakeRates {
    async fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&(from.to_string(), to.to_string())).copied()
    }

    fn reference_currency(&self) -> &str {
        "SAR"
    }
}

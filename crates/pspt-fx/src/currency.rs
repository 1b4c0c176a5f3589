//! Local currency resolution per country.
//!
//! The currency a storefront displays is not authoritative; this looks up
//! the currencies a country legally uses from a reference dataset.

use std::time::Duration;

use async_trait::async_trait;
use pspt_core::TtlCache;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::FxError;
use crate::http::{build_client, get_json, normalize_base_url};
use crate::retry::retry_with_backoff;

pub const CURRENCY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CURRENCY_RETRIES: u32 = 1;

/// Source of a country's local currency codes.
#[async_trait]
pub trait CurrencySource: Send + Sync {
    /// Upper-cased currency codes in reference order; empty when unknown.
    async fn local_currencies(&self, iso_code: &str) -> Vec<String>;
}

#[derive(Debug, Deserialize)]
struct CountryEntry {
    #[serde(default)]
    currencies: Option<Map<String, Value>>,
}

/// The reference API answers with either a single entry or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CountryPayload {
    Many(Vec<CountryEntry>),
    One(CountryEntry),
}

impl CountryPayload {
    fn currency_codes(self) -> Vec<String> {
        let entry = match self {
            CountryPayload::Many(entries) => entries.into_iter().next(),
            CountryPayload::One(entry) => Some(entry),
        };
        entry
            .and_then(|e| e.currencies)
            .map(|map| map.keys().map(|k| k.to_ascii_uppercase()).collect())
            .unwrap_or_default()
    }
}

/// Resolves local currencies through a `restcountries`-style API, caching
/// each country's answer for [`CURRENCY_CACHE_TTL`].
pub struct CurrencyResolver {
    client: Client,
    base_url: String,
    backoff_base_ms: u64,
    cache: TtlCache<Vec<String>>,
}

impl CurrencyResolver {
    /// # Errors
    ///
    /// Returns [`FxError::Http`] if the HTTP client cannot be built, or
    /// [`FxError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
        backoff_base_ms: u64,
    ) -> Result<Self, FxError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: normalize_base_url(base_url)?,
            backoff_base_ms,
            cache: TtlCache::new(CURRENCY_CACHE_TTL),
        })
    }

    /// Local currency codes for `iso_code`. Lookup failures are logged and
    /// produce an empty list, which callers treat as "unknown".
    pub async fn local_currencies(&self, iso_code: &str) -> Vec<String> {
        let iso = iso_code.trim().to_ascii_uppercase();
        let cache_key = format!("country-currencies:{iso}");
        if let Some(codes) = self.cache.get(&cache_key) {
            tracing::debug!(iso_code = %iso, "currency cache hit");
            return codes;
        }

        let result = retry_with_backoff(&cache_key, CURRENCY_RETRIES, self.backoff_base_ms, || {
            self.lookup(&iso)
        })
        .await;
        match result {
            Ok(codes) => {
                self.cache.insert(cache_key, codes.clone());
                codes
            }
            Err(e) => {
                tracing::warn!(iso_code = %iso, error = %e, "failed to resolve local currencies");
                Vec::new()
            }
        }
    }

    async fn lookup(&self, iso: &str) -> Result<Vec<String>, FxError> {
        let url = format!("{}/alpha/{iso}?fields=cca2,currencies", self.base_url);
        let payload: CountryPayload =
            get_json(&self.client, &url, &format!("currencies({iso})")).await?;
        let codes = payload.currency_codes();
        if codes.is_empty() {
            return Err(FxError::NoCurrencies {
                iso_code: iso.to_owned(),
            });
        }
        Ok(codes)
    }
}

#[async_trait]
impl CurrencySource for CurrencyResolver {
    async fn local_currencies(&self, iso_code: &str) -> Vec<String> {
        CurrencyResolver::local_currencies(self, iso_code).await
    }
}

/// Storefront currency label as it should be compared and converted.
///
/// Upper-cases the code and remaps Croatia's retired kuna to the euro, which
/// some storefront payloads still report.
#[must_use]
pub fn normalize_storefront_currency(iso_code: &str, currency: &str) -> String {
    let code = currency.trim().to_ascii_uppercase();
    if iso_code.eq_ignore_ascii_case("HR") && code == "HRK" {
        return "EUR".to_owned();
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn croatian_kuna_is_presented_as_euro() {
        assert_eq!(normalize_storefront_currency("HR", "HRK"), "EUR");
        assert_eq!(normalize_storefront_currency("hr", "hrk"), "EUR");
    }

    #[test]
    fn other_currencies_are_only_upper_cased() {
        assert_eq!(normalize_storefront_currency("HR", "eur"), "EUR");
        assert_eq!(normalize_storefront_currency("RS", "HRK"), "HRK");
        assert_eq!(normalize_storefront_currency("US", " usd "), "USD");
    }

    #[test]
    fn payload_accepts_list_or_object() {
        let many: CountryPayload =
            serde_json::from_str(r#"[{"cca2":"CH","currencies":{"CHF":{"name":"Swiss franc"}}}]"#)
                .unwrap();
        assert_eq!(many.currency_codes(), vec!["CHF"]);

        let one: CountryPayload = serde_json::from_str(
            r#"{"cca2":"PA","currencies":{"pab":{},"usd":{}}}"#,
        )
        .unwrap();
        assert_eq!(one.currency_codes(), vec!["PAB", "USD"]);
    }

    #[test]
    fn payload_without_currencies_is_empty() {
        let empty: CountryPayload = serde_json::from_str(r#"{"cca2":"AQ"}"#).unwrap();
        assert!(empty.currency_codes().is_empty());
        let none: CountryPayload = serde_json::from_str("[]").unwrap();
        assert!(none.currency_codes().is_empty());
    }
}

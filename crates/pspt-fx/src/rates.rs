//! Exchange rates anchored at a reference currency.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use pspt_core::TtlCache;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FxError;
use crate::http::{build_client, get_json, normalize_base_url};
use crate::retry::retry_with_backoff;

pub const FX_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);
const FX_RETRIES: u32 = 2;

/// Source of multiplicative conversion rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Rate such that `amount_in_from * rate = amount_in_to`; `None` when
    /// unavailable.
    async fn rate(&self, from: &str, to: &str) -> Option<Decimal>;

    /// Currency every price is ultimately compared in.
    fn reference_currency(&self) -> &str;

    async fn rate_to_reference(&self, from: &str) -> Option<Decimal> {
        self.rate(from, self.reference_currency()).await
    }
}

#[derive(Debug, Deserialize)]
struct RateTable {
    result: Option<String>,
    #[serde(default)]
    rates: HashMap<String, Value>,
}

/// Rates from an `open.er-api.com`-style `latest/{base}` endpoint, cached
/// per ordered pair for [`FX_CACHE_TTL`].
pub struct FxService {
    client: Client,
    base_url: String,
    reference_currency: String,
    backoff_base_ms: u64,
    cache: TtlCache<Decimal>,
}

impl FxService {
    /// # Errors
    ///
    /// Returns [`FxError::Http`] if the HTTP client cannot be built, or
    /// [`FxError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
        reference_currency: &str,
        backoff_base_ms: u64,
    ) -> Result<Self, FxError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: normalize_base_url(base_url)?,
            reference_currency: reference_currency.trim().to_ascii_uppercase(),
            backoff_base_ms,
            cache: TtlCache::new(FX_CACHE_TTL),
        })
    }

    #[must_use]
    pub fn reference_currency(&self) -> &str {
        &self.reference_currency
    }

    /// Conversion rate from `from` to `to`. Identical codes return 1 without
    /// a lookup; failures are logged and return `None`.
    pub async fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();
        if from == to {
            return Some(Decimal::ONE);
        }

        let cache_key = format!("fx:{from}:{to}");
        if let Some(rate) = self.cache.get(&cache_key) {
            tracing::debug!(%from, %to, "fx cache hit");
            return Some(rate);
        }

        let result = retry_with_backoff(&cache_key, FX_RETRIES, self.backoff_base_ms, || {
            self.lookup(&from, &to)
        })
        .await;
        match result {
            Ok(rate) => {
                self.cache.insert(cache_key, rate);
                Some(rate)
            }
            Err(e) => {
                tracing::warn!(%from, %to, error = %e, "failed to load FX rate");
                None
            }
        }
    }

    /// Rate from `from` to the reference currency.
    pub async fn rate_to_reference(&self, from: &str) -> Option<Decimal> {
        self.rate(from, &self.reference_currency).await
    }

    async fn lookup(&self, from: &str, to: &str) -> Result<Decimal, FxError> {
        let url = format!("{}/latest/{from}", self.base_url);
        let table: RateTable = get_json(&self.client, &url, &format!("latest({from})")).await?;

        if table.result.as_deref() != Some("success") {
            return Err(FxError::Unsuccessful {
                base: from.to_owned(),
                result: table.result,
            });
        }

        let raw = table.rates.get(to).ok_or_else(|| FxError::MissingRate {
            from: from.to_owned(),
            to: to.to_owned(),
        })?;
        decode_rate(raw).ok_or_else(|| FxError::InvalidRate {
            from: from.to_owned(),
            to: to.to_owned(),
            value: raw.to_string(),
        })
    }
}

/// A positive numeric rate. Strings and non-positive values are rejected.
fn decode_rate(raw: &Value) -> Option<Decimal> {
    let Value::Number(n) = raw else {
        return None;
    };
    let text = n.to_string();
    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    (rate > Decimal::ZERO).then_some(rate)
}

#[async_trait]
impl RateSource for FxService {
    async fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        FxService::rate(self, from, to).await
    }

    fn reference_currency(&self) -> &str {
        &self.reference_currency
    }
}

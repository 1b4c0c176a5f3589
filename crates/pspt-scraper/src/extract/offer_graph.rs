use std::sync::LazyLock;

use pspt_core::{DurationMonths, ParsedPriceEntry, Tier};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::Value;

use super::normalize_currency;
use crate::currency::{decimal_from_json, minor_to_major};

const OFFER_GRAPH_MARKER: &str = "tierSelectorOffersRetrieve";

static JSON_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct OfferGraphPayload {
    args: Option<OfferGraphArgs>,
    cache: Option<OfferGraphCache>,
}

#[derive(Debug, Deserialize)]
struct OfferGraphArgs {
    #[serde(rename = "tierId")]
    tier_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfferGraphCache {
    #[serde(rename = "ROOT_QUERY")]
    root_query: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct OfferList {
    #[serde(default)]
    offers: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    duration: Option<OfferDuration>,
    price: Option<OfferPrice>,
}

#[derive(Debug, Deserialize)]
struct OfferDuration {
    value: Option<serde_json::Number>,
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    #[serde(rename = "basePriceValue")]
    base_price_value: Option<serde_json::Number>,
    #[serde(rename = "currencyCode")]
    currency_code: Option<String>,
}

fn tier_for_id(tier_id: &str) -> Option<Tier> {
    match tier_id {
        "TIER_10" => Some(Tier::Essential),
        "TIER_20" => Some(Tier::Extra),
        "TIER_30" => Some(Tier::Premium),
        _ => None,
    }
}

pub(super) fn parse(html: &str, source_url: &str) -> Vec<ParsedPriceEntry> {
    let mut entries = Vec::new();

    for caps in JSON_SCRIPT_RE.captures_iter(html) {
        let content = caps[1].trim();
        if content.is_empty() || !content.contains(OFFER_GRAPH_MARKER) {
            continue;
        }

        let Ok(payload) = serde_json::from_str::<OfferGraphPayload>(content) else {
            tracing::debug!(source_url, "skipping malformed offer graph script");
            continue;
        };

        let Some(tier) = payload
            .args
            .and_then(|a| a.tier_id)
            .as_deref()
            .and_then(tier_for_id)
        else {
            continue;
        };
        let Some(root_query) = payload.cache.and_then(|c| c.root_query) else {
            continue;
        };

        for value in root_query.values() {
            let Ok(list) = OfferList::deserialize(value) else {
                continue;
            };
            for raw_offer in &list.offers {
                if let Some(entry) = decode_offer(raw_offer, tier, source_url) {
                    entries.push(entry);
                }
            }
        }
    }

    entries
}

fn decode_offer(raw: &Value, tier: Tier, source_url: &str) -> Option<ParsedPriceEntry> {
    let offer = Offer::deserialize(raw).ok()?;

    let months = offer.duration?.value?.as_i64()?;
    let duration_months = DurationMonths::from_months(months)?;

    let price = offer.price?;
    let currency = normalize_currency(price.currency_code.as_deref())?;
    let minor = price.base_price_value.as_ref().and_then(minor_units)?;

    Some(ParsedPriceEntry {
        tier,
        duration_months,
        price: minor_to_major(minor, &currency),
        currency,
        source_url: source_url.to_string(),
    })
}

/// Minor-unit amounts are integers; a float with no fractional part is accepted.
fn minor_units(number: &serde_json::Number) -> Option<i64> {
    if let Some(i) = number.as_i64() {
        return Some(i);
    }
    let value = decimal_from_json(number)?;
    if value.fract().is_zero() {
        value.to_i64()
    } else {
        None
    }
}

//! Subscription price extraction from a storefront page.
//!
//! Three strategies run in strict priority order and the first one that
//! yields anything wins; results are never merged across strategies.
//!
//! 1. [`offer_graph`]: inline JSON script payloads carrying the tier selector
//!    offer graph (minor-unit prices).
//! 2. [`product_info`]: the entity-encoded `data-product-info` attribute with
//!    its `skus` list.
//! 3. [`jsonld`]: any JSON-LD node exposing both `price` and `priceCurrency`.
//!
//! Each strategy is a pure decode from page text to entries; anything that
//! does not decode as the expected shape is skipped.

mod jsonld;
mod offer_graph;
mod product_info;

use std::collections::HashMap;

use pspt_core::{DurationMonths, ParsedPriceEntry, Tier};
use serde::Deserialize;

use crate::currency::decimal_from_json;
use crate::number::parse_localized_number;

/// Which extraction strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    OfferGraph,
    ProductInfo,
    JsonLd,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStrategy::OfferGraph => write!(f, "offer_graph"),
            ExtractionStrategy::ProductInfo => write!(f, "product_info"),
            ExtractionStrategy::JsonLd => write!(f, "json_ld"),
        }
    }
}

/// Non-empty output of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub strategy: ExtractionStrategy,
    pub entries: Vec<ParsedPriceEntry>,
}

/// Runs the strategy cascade and returns the first non-empty result.
///
/// `None` means the page held no parsable price data, which callers must
/// report separately from a fetch failure.
#[must_use]
pub fn extract(html: &str, source_url: &str) -> Option<Extraction> {
    let strategies: [(ExtractionStrategy, fn(&str, &str) -> Vec<ParsedPriceEntry>); 3] = [
        (ExtractionStrategy::OfferGraph, offer_graph::parse),
        (ExtractionStrategy::ProductInfo, product_info::parse),
        (ExtractionStrategy::JsonLd, jsonld::parse),
    ];

    strategies.into_iter().find_map(|(strategy, parse)| {
        let entries = dedupe_by_plan(parse(html, source_url));
        if entries.is_empty() {
            None
        } else {
            tracing::debug!(%strategy, count = entries.len(), source_url, "extracted prices");
            Some(Extraction { strategy, entries })
        }
    })
}

/// Convenience over [`extract`] that drops the strategy tag.
#[must_use]
pub fn extract_prices(html: &str, source_url: &str) -> Vec<ParsedPriceEntry> {
    extract(html, source_url).map_or_else(Vec::new, |e| e.entries)
}

/// Collapses entries sharing `(tier, duration)`. The later entry's values win
/// but the key keeps the position where it first appeared.
fn dedupe_by_plan(entries: Vec<ParsedPriceEntry>) -> Vec<ParsedPriceEntry> {
    let mut positions: HashMap<(Tier, DurationMonths), usize> = HashMap::new();
    let mut out: Vec<ParsedPriceEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        let key = (entry.tier, entry.duration_months);
        if let Some(&idx) = positions.get(&key) {
            out[idx] = entry;
        } else {
            positions.insert(key, out.len());
            out.push(entry);
        }
    }

    out
}

/// A price field that may be a JSON number or a localized string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Number(serde_json::Number),
    Text(String),
}

impl PriceValue {
    fn to_decimal(&self) -> Option<rust_decimal::Decimal> {
        match self {
            PriceValue::Number(n) => decimal_from_json(n),
            PriceValue::Text(s) => parse_localized_number(s),
        }
    }
}

/// Upper-cased, non-empty currency code.
fn normalize_currency(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_uppercase)
}

#[cfg(test)]
#[path = "../extract_test.rs"]
mod tests;

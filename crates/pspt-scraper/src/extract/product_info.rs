use std::sync::LazyLock;

use pspt_core::ParsedPriceEntry;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{normalize_currency, PriceValue};
use crate::text::{decode_html_entities, infer_duration, infer_tier};

static PRODUCT_INFO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)data-product-info\s*=\s*"([^"]*)""#).expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct ProductInfo {
    #[serde(default)]
    skus: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Sku {
    name: Option<String>,
    price: Option<PriceValue>,
    #[serde(rename = "priceCurrency")]
    price_currency: Option<String>,
}

/// Reads the first `data-product-info` attribute on the page.
pub(super) fn parse(html: &str, source_url: &str) -> Vec<ParsedPriceEntry> {
    let Some(caps) = PRODUCT_INFO_RE.captures(html) else {
        return Vec::new();
    };

    let decoded = decode_html_entities(&caps[1]);
    let info = match serde_json::from_str::<ProductInfo>(&decoded) {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(source_url, error = %e, "failed to parse data-product-info");
            return Vec::new();
        }
    };

    info.skus
        .iter()
        .filter_map(|raw| decode_sku(raw, source_url))
        .collect()
}

fn decode_sku(raw: &Value, source_url: &str) -> Option<ParsedPriceEntry> {
    let sku = Sku::deserialize(raw).ok()?;
    let name = sku.name.unwrap_or_default();

    let tier = infer_tier(&name)?;
    let duration_months = infer_duration(&name)?;
    let price = sku.price.as_ref()?.to_decimal()?;
    let currency = normalize_currency(sku.price_currency.as_deref())?;

    Some(ParsedPriceEntry {
        tier,
        duration_months,
        price,
        currency,
        source_url: source_url.to_string(),
    })
}

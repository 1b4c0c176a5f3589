use std::sync::LazyLock;

use pspt_core::ParsedPriceEntry;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{normalize_currency, PriceValue};
use crate::text::{infer_duration, infer_tier};

static JSONLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*application/ld\+json[^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// A JSON-LD node that advertises a price.
#[derive(Debug, Deserialize)]
struct PricedNode {
    price: PriceValue,
    #[serde(rename = "priceCurrency")]
    price_currency: String,
}

/// Text fields used to infer tier and duration.
#[derive(Debug, Default, Deserialize)]
struct NodeContext {
    name: Option<Value>,
    description: Option<Value>,
    category: Option<Value>,
}

impl NodeContext {
    fn text(&self) -> String {
        [&self.name, &self.description, &self.category]
            .into_iter()
            .flatten()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub(super) fn parse(html: &str, source_url: &str) -> Vec<ParsedPriceEntry> {
    let mut entries = Vec::new();

    for caps in JSONLD_RE.captures_iter(html) {
        let content = caps[1].trim();
        if content.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(content) {
            Ok(block) => collect(&block, None, source_url, &mut entries),
            Err(e) => tracing::warn!(source_url, error = %e, "failed to parse JSON-LD block"),
        }
    }

    entries
}

/// Depth-first scan. Each node is keyed by its own name/description/category.
/// The one exception is an offer listed under its parent's `offers` field
/// with no text of its own, which takes the parent's text. Nodes anywhere
/// else never borrow context.
fn collect(
    node: &Value,
    parent_offer_context: Option<&str>,
    source_url: &str,
    out: &mut Vec<ParsedPriceEntry>,
) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect(item, None, source_url, out);
            }
        }
        Value::Object(map) => {
            let own = NodeContext::deserialize(node).unwrap_or_default().text();
            let context = if own.is_empty() {
                parent_offer_context
            } else {
                Some(own.as_str())
            };

            if map.contains_key("price") && map.contains_key("priceCurrency") {
                if let Some(entry) = decode_priced(node, context.unwrap_or(""), source_url) {
                    out.push(entry);
                }
            }

            for (key, value) in map {
                match (key.as_str(), value) {
                    ("offers", Value::Array(offers)) => {
                        for offer in offers {
                            collect(offer, context, source_url, out);
                        }
                    }
                    ("offers", Value::Object(_)) => collect(value, context, source_url, out),
                    _ => collect(value, None, source_url, out),
                }
            }
        }
        _ => {}
    }
}

fn decode_priced(node: &Value, context: &str, source_url: &str) -> Option<ParsedPriceEntry> {
    let priced = PricedNode::deserialize(node).ok()?;

    let tier = infer_tier(context)?;
    let duration_months = infer_duration(context)?;
    let currency = normalize_currency(Some(&priced.price_currency))?;
    let price = priced.price.to_decimal()?;
    if price.is_zero() {
        return None;
    }

    Some(ParsedPriceEntry {
        tier,
        duration_months,
        price,
        currency,
        source_url: source_url.to_string(),
    })
}

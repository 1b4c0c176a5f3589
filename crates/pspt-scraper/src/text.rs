//! Small text helpers shared by the page parsers.

use std::sync::LazyLock;

use pspt_core::{DurationMonths, Tier};
use regex::{Captures, Regex};

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#(\d+)|#[xX]([0-9a-fA-F]+)|(quot|apos|amp|lt|gt|nbsp));")
        .expect("valid regex")
});

/// Decodes numeric and the common named HTML entities in one pass, then trims.
///
/// Single pass means `&amp;quot;` becomes `&quot;`, not `"`.
#[must_use]
pub fn decode_html_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if let Some(dec) = caps.get(1) {
                return dec
                    .as_str()
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map_or_else(|| caps[0].to_string(), String::from);
            }
            if let Some(hex) = caps.get(2) {
                return u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map_or_else(|| caps[0].to_string(), String::from);
            }
            match caps.get(3).map(|m| m.as_str()) {
                Some("quot") => "\"".to_string(),
                Some("apos") => "'".to_string(),
                Some("amp") => "&".to_string(),
                Some("lt") => "<".to_string(),
                Some("gt") => ">".to_string(),
                Some("nbsp") => "\u{a0}".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .trim()
        .to_string()
}

/// Infers the plan level from free text by case-insensitive keyword.
#[must_use]
pub fn infer_tier(text: &str) -> Option<Tier> {
    let lower = text.to_lowercase();
    if lower.contains("essential") {
        Some(Tier::Essential)
    } else if lower.contains("extra") {
        Some(Tier::Extra)
    } else if lower.contains("premium") || lower.contains("deluxe") {
        Some(Tier::Premium)
    } else {
        None
    }
}

/// Infers the billing period from free text. Checked 12, then 3, then 1;
/// the first hit wins.
#[must_use]
pub fn infer_duration(text: &str) -> Option<DurationMonths> {
    let lower = text.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if any(&["12", "year", "annual"]) {
        Some(DurationMonths::Twelve)
    } else if any(&["3", "quarter"]) {
        Some(DurationMonths::Three)
    } else if any(&["1", "month"]) {
        Some(DurationMonths::One)
    } else {
        None
    }
}

//! Storefront URL builders.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use pspt_core::Country;

/// Characters left unescaped in a search path segment, matching the
/// encoding browsers apply to a URI component.
const SEARCH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The country's PlayStation Plus page: its override URL, else the regional page.
#[must_use]
pub fn subscription_page_url(storefront_base: &str, country: &Country) -> String {
    match country.source_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("{storefront_base}/{}/ps-plus/", country.region_identifier),
    }
}

#[must_use]
pub fn search_url(store_base: &str, region_identifier: &str, query: &str) -> String {
    let encoded = utf8_percent_encode(query, SEARCH_SEGMENT);
    format!("{store_base}/{region_identifier}/search/{encoded}")
}

#[must_use]
pub fn product_url(store_base: &str, region_identifier: &str, product_id: &str) -> String {
    format!("{store_base}/{region_identifier}/product/{product_id}")
}

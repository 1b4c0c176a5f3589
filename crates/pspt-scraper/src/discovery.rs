//! Supported-country discovery from the regional alternate links on the
//! PlayStation Plus landing page.

use std::collections::HashSet;
use std::sync::LazyLock;

use pspt_core::NewCountry;
use regex::Regex;

static ALTERNATE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link[^>]+rel="alternate"[^>]+hreflang="([^"]+)"[^>]+href="([^"]+)""#)
        .expect("valid regex")
});

/// Parses `<link rel="alternate" hreflang=… href=…>` tags into countries.
///
/// Only hrefs pointing at a `/ps-plus/` page count. The ISO code is the last
/// `-` segment of the hreflang; the first tag seen for an ISO code wins.
/// The result is sorted by English country name.
#[must_use]
pub fn parse_discovered_countries(html: &str) -> Vec<NewCountry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut countries: Vec<NewCountry> = Vec::new();

    for caps in ALTERNATE_LINK_RE.captures_iter(html) {
        let hreflang = caps[1].to_ascii_lowercase();
        let href = &caps[2];

        if hreflang == "x-default" || !href.contains("/ps-plus/") {
            continue;
        }

        let iso_code = hreflang
            .rsplit('-')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        if iso_code.len() != 2 || !iso_code.bytes().all(|b| b.is_ascii_alphabetic()) {
            continue;
        }
        if !seen.insert(iso_code.clone()) {
            continue;
        }

        countries.push(NewCountry {
            name: country_name(&iso_code).unwrap_or(iso_code.as_str()).to_string(),
            iso_code,
            region_identifier: hreflang,
            source_url: Some(href.to_string()),
        });
    }

    countries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.iso_code.cmp(&b.iso_code))
    });
    countries
}

/// English short name for the regions the storefront serves.
#[must_use]
pub fn country_name(iso_code: &str) -> Option<&'static str> {
    let name = match iso_code {
        "AE" => "United Arab Emirates",
        "AR" => "Argentina",
        "AT" => "Austria",
        "AU" => "Australia",
        "BE" => "Belgium",
        "BG" => "Bulgaria",
        "BH" => "Bahrain",
        "BO" => "Bolivia",
        "BR" => "Brazil",
        "CA" => "Canada",
        "CH" => "Switzerland",
        "CL" => "Chile",
        "CN" => "China",
        "CO" => "Colombia",
        "CR" => "Costa Rica",
        "CY" => "Cyprus",
        "CZ" => "Czechia",
        "DE" => "Germany",
        "DK" => "Denmark",
        "EC" => "Ecuador",
        "ES" => "Spain",
        "FI" => "Finland",
        "FR" => "France",
        "GB" => "United Kingdom",
        "GR" => "Greece",
        "GT" => "Guatemala",
        "HK" => "Hong Kong SAR China",
        "HN" => "Honduras",
        "HR" => "Croatia",
        "HU" => "Hungary",
        "ID" => "Indonesia",
        "IE" => "Ireland",
        "IL" => "Israel",
        "IN" => "India",
        "IS" => "Iceland",
        "IT" => "Italy",
        "JP" => "Japan",
        "KR" => "South Korea",
        "KW" => "Kuwait",
        "LB" => "Lebanon",
        "LU" => "Luxembourg",
        "MT" => "Malta",
        "MX" => "Mexico",
        "MY" => "Malaysia",
        "NI" => "Nicaragua",
        "NL" => "Netherlands",
        "NO" => "Norway",
        "NZ" => "New Zealand",
        "OM" => "Oman",
        "PA" => "Panama",
        "PE" => "Peru",
        "PH" => "Philippines",
        "PL" => "Poland",
        "PT" => "Portugal",
        "PY" => "Paraguay",
        "QA" => "Qatar",
        "RO" => "Romania",
        "RS" => "Serbia",
        "RU" => "Russia",
        "SA" => "Saudi Arabia",
        "SE" => "Sweden",
        "SG" => "Singapore",
        "SI" => "Slovenia",
        "SK" => "Slovakia",
        "SV" => "El Salvador",
        "TH" => "Thailand",
        "TR" => "Türkiye",
        "TW" => "Taiwan",
        "UA" => "Ukraine",
        "US" => "United States",
        "UY" => "Uruguay",
        "VN" => "Vietnam",
        "ZA" => "South Africa",
        _ => return None,
    };
    Some(name)
}

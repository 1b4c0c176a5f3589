//! Game product matching over a storefront search-results page.
//!
//! Tiles are located by their `search#productTile` marker; each tile runs to
//! the next marker. A tile missing its product link, name or price text is
//! skipped.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::number::parse_localized_number;
use crate::text::decode_html_entities;

static TILE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-qa="search#productTile(\d+)"\s+data-qa-index="\d+""#).expect("valid regex")
});
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href="([^"]*/product/[^"]+)""#).expect("valid regex")
});
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)#product-name"[^>]*>(.*?)</span>"#).expect("valid regex")
});
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)#price#display-price"[^>]*>(.*?)</span>"#).expect("valid regex")
});
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)#product-type"[^>]*>(.*?)</span>"#).expect("valid regex")
});
static POSTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)#game-art#image#image-no-js"[^>]*src="([^"]+)""#).expect("valid regex")
});
static POSTER_PREVIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)#game-art#image#preview"[^>]*src="([^"]+)""#).expect("valid regex")
});
static THUMB_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?w=\d+&thumb=true$").expect("valid regex"));
static TYPE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9]+").expect("valid regex"));
static CURRENCY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3}\b").expect("valid regex"));
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s.,\u{a0}]*").expect("valid regex"));

const EXCLUDED_TYPE_CODES: [&str; 5] = [
    "ADD_ON",
    "VIRTUAL_CURRENCY",
    "SEASON_PASS",
    "AVATAR",
    "THEME",
];
const EXCLUDED_TYPE_LABELS: [&str; 5] = [
    "add-on",
    "avatar",
    "theme",
    "season pass",
    "virtual currency",
];

const SYMBOL_CURRENCIES: [(&str, &str); 9] = [
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₩", "KRW"),
    ("₺", "TRY"),
    ("₽", "RUB"),
    ("₹", "INR"),
    ("R$", "BRL"),
    ("zł", "PLN"),
];
const KRONA_CURRENCIES: [&str; 3] = ["SEK", "NOK", "DKK"];

/// One product tile from a search-results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTile {
    pub product_id: String,
    pub name: String,
    pub display_price: String,
    /// Localized label as shown on the tile, e.g. "Full Game".
    pub product_type: String,
    /// Label upper-cased with runs of non-alphanumerics replaced by `_`.
    pub type_code: String,
    pub poster_url: Option<String>,
}

/// The selected product with its parsed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameMatch {
    pub product_id: String,
    pub name: String,
    pub product_type: String,
    pub poster_url: Option<String>,
    pub display_price: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
}

#[must_use]
pub fn parse_search_tiles(html: &str) -> Vec<GameTile> {
    let starts: Vec<usize> = TILE_MARKER_RE.find_iter(html).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            parse_tile(&html[start..end])
        })
        .collect()
}

fn parse_tile(block: &str) -> Option<GameTile> {
    let capture = |re: &Regex| re.captures(block).map(|c| c[1].to_string());

    let href = capture(&HREF_RE)?;
    let name = decode_html_entities(&capture(&NAME_RE)?);
    let display_price = decode_html_entities(&capture(&PRICE_RE)?);

    let product_id = href
        .split_once("/product/")
        .map_or(href.as_str(), |(_, id)| id)
        .to_string();
    let product_type =
        decode_html_entities(&capture(&TYPE_RE).unwrap_or_else(|| "Unknown".to_string()));
    let type_code = TYPE_CODE_RE
        .replace_all(&product_type.to_uppercase(), "_")
        .into_owned();
    let poster_url = capture(&POSTER_RE)
        .or_else(|| capture(&POSTER_PREVIEW_RE))
        .map(|raw| THUMB_SUFFIX_RE.replace(&decode_html_entities(&raw), "").into_owned());

    Some(GameTile {
        product_id,
        name,
        display_price,
        product_type,
        type_code,
        poster_url,
    })
}

/// Add-ons, virtual currency, season passes, avatars and themes.
#[must_use]
pub fn is_excluded(tile: &GameTile) -> bool {
    let label = tile.product_type.to_lowercase();
    EXCLUDED_TYPE_CODES.iter().any(|c| tile.type_code.contains(c))
        || EXCLUDED_TYPE_LABELS.iter().any(|l| label.contains(l))
}

#[must_use]
pub fn is_free(display_price: &str) -> bool {
    display_price.trim().eq_ignore_ascii_case("free")
}

/// +3 per query token in the name, a bonus for full games, bundles and
/// premium editions, and -4 for excluded product types.
#[must_use]
pub fn score_tile(tile: &GameTile, query: &str) -> i32 {
    let name = tile.name.to_lowercase();
    let query = query.to_lowercase();

    let mut score: i32 = query
        .split_whitespace()
        .filter(|token| name.contains(token))
        .map(|_| 3)
        .sum();

    if tile.type_code.contains("FULL_GAME") {
        score += 4;
    }
    if tile.type_code.contains("GAME_BUNDLE") {
        score += 3;
    }
    if tile.type_code.contains("PREMIUM_EDITION") {
        score += 2;
    }
    if is_excluded(tile) {
        score -= 4;
    }
    score
}

/// Highest positive score wins, earliest tile on ties. With no positive
/// score, the first non-free tile is the fallback. Excluded product types
/// are never eligible on either path.
#[must_use]
pub fn select_best<'a>(tiles: &'a [GameTile], query: &str) -> Option<&'a GameTile> {
    let eligible = || tiles.iter().filter(|t| !is_excluded(t));

    let mut best: Option<(&GameTile, i32)> = None;
    for tile in eligible() {
        let score = score_tile(tile, query);
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((tile, score));
        }
    }

    best.map(|(tile, _)| tile)
        .or_else(|| eligible().find(|t| !is_free(&t.display_price)))
}

/// Currency of a display price: an explicit ISO code, then a known symbol,
/// then the country's local currency.
#[must_use]
pub fn infer_currency(display_price: &str, local_currency: Option<&str>) -> Option<String> {
    if let Some(code) = CURRENCY_CODE_RE.find(display_price) {
        return Some(code.as_str().to_string());
    }

    if let Some((_, code)) = SYMBOL_CURRENCIES
        .iter()
        .find(|(symbol, _)| display_price.contains(symbol))
    {
        return Some((*code).to_string());
    }

    if display_price.contains("kr") {
        if let Some(local) = local_currency.filter(|c| KRONA_CURRENCIES.contains(c)) {
            return Some(local.to_string());
        }
    }

    // "$" is shared by many currencies, so it resolves to the local one too.
    local_currency.map(str::to_string)
}

/// Numeric part of a display price, parsed as a localized number.
#[must_use]
pub fn parse_display_amount(display_price: &str) -> Option<Decimal> {
    AMOUNT_RE
        .find(display_price)
        .and_then(|m| parse_localized_number(m.as_str()))
}

/// Picks the best purchasable product for `query`. Free products yield `None`.
#[must_use]
pub fn best_match(html: &str, query: &str, local_currency: Option<&str>) -> Option<GameMatch> {
    let tiles = parse_search_tiles(html);
    let best = select_best(&tiles, query)?;

    if is_free(&best.display_price) {
        return None;
    }

    Some(GameMatch {
        product_id: best.product_id.clone(),
        name: best.name.clone(),
        product_type: best.product_type.clone(),
        poster_url: best.poster_url.clone(),
        amount: parse_display_amount(&best.display_price),
        currency: infer_currency(&best.display_price, local_currency),
        display_price: best.display_price.clone(),
    })
}

#[cfg(test)]
#[path = "games_test.rs"]
mod tests;

//! ISO 4217 minor-unit handling.

use std::str::FromStr;

use rust_decimal::Decimal;

const ZERO_DIGIT: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "UYI", "VND",
    "VUV", "XAF", "XOF", "XPF",
];

const THREE_DIGIT: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

const FOUR_DIGIT: &[&str] = &["CLF", "UYW"];

/// Number of fractional digits in a currency's standard minor unit.
/// Unknown codes default to 2.
#[must_use]
pub fn fraction_digits(currency: &str) -> u32 {
    let code = currency.to_ascii_uppercase();
    let code = code.as_str();
    if ZERO_DIGIT.contains(&code) {
        0
    } else if THREE_DIGIT.contains(&code) {
        3
    } else if FOUR_DIGIT.contains(&code) {
        4
    } else {
        2
    }
}

/// Converts an integer amount in minor units to major units.
#[must_use]
pub fn minor_to_major(minor: i64, currency: &str) -> Decimal {
    Decimal::new(minor, fraction_digits(currency))
}

/// Exact decimal for a JSON number, including exponent notation.
#[must_use]
pub(crate) fn decimal_from_json(number: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = number.as_i64() {
        return Some(Decimal::from(i));
    }
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

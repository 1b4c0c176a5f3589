//! Parsing of localized price text into exact decimals.
//!
//! Storefronts render prices as `1.299,99`, `1,299.99`, `59,99`, `¥1,200`
//! and so on. The rules below pick the decimal separator without any
//! knowledge of the locale.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parses an ambiguous localized price string.
///
/// Whitespace (including non-breaking spaces) and quote characters used as
/// digit-group marks are dropped, then everything except digits, `,`, `.`
/// and `-` is discarded. A leading `-` makes the result negative.
///
/// - Both `,` and `.` present: the rightmost one is the decimal point when
///   1 to 3 digits follow it, and every occurrence of the other is a group
///   separator. Otherwise both are group separators.
/// - Only one kind present: it is the decimal point when it occurs exactly
///   once and is followed by 1 or 2 digits. Otherwise every occurrence is a
///   group separator.
///
/// Returns `None` for empty input or anything that does not reduce to a
/// single well-formed number.
#[must_use]
pub fn parse_localized_number(text: &str) -> Option<Decimal> {
    let kept: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !is_quote_mark(*c))
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if kept.is_empty() {
        return None;
    }

    let negative = kept.starts_with('-');
    let unsigned: String = kept.chars().filter(|c| *c != '-').collect();

    let has_comma = unsigned.contains(',');
    let has_dot = unsigned.contains('.');

    let normalized = match (has_comma, has_dot) {
        (true, true) => {
            let rightmost = unsigned.rfind([',', '.'])?;
            let decimal_sep = if unsigned[rightmost..].starts_with(',') {
                ','
            } else {
                '.'
            };
            let digits_after = unsigned.len() - rightmost - 1;
            if (1..=3).contains(&digits_after) {
                with_decimal_separator(&unsigned, decimal_sep)?
            } else {
                strip_separators(&unsigned)
            }
        }
        (true, false) => single_separator(&unsigned, ','),
        (false, true) => single_separator(&unsigned, '.'),
        (false, false) => unsigned,
    };

    if normalized.is_empty() || normalized == "." {
        return None;
    }

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

fn is_quote_mark(c: char) -> bool {
    matches!(c, '\'' | '"' | '\u{2019}' | '\u{2018}' | '\u{201C}' | '\u{201D}')
}

fn strip_separators(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, ',' | '.')).collect()
}

/// Drops every group separator and rewrites the single remaining decimal
/// separator as `.`. More than one decimal separator left over is malformed.
fn with_decimal_separator(value: &str, decimal_sep: char) -> Option<String> {
    let group_sep = if decimal_sep == ',' { '.' } else { ',' };
    let without_groups: String = value.chars().filter(|c| *c != group_sep).collect();
    if without_groups.matches(decimal_sep).count() != 1 {
        return None;
    }
    Some(without_groups.replace(decimal_sep, "."))
}

fn single_separator(value: &str, sep: char) -> String {
    let occurrences = value.matches(sep).count();
    let digits_after = value
        .rfind(sep)
        .map_or(0, |pos| value.len() - pos - sep.len_utf8());

    if occurrences == 1 && (1..=2).contains(&digits_after) {
        value.replace(sep, ".")
    } else {
        value.chars().filter(|c| *c != sep).collect()
    }
}

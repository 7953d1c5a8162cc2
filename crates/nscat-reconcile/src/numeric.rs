//! Locale-tolerant price parsing and kilogram to gram conversion.

use std::str::FromStr;
use std::sync::LazyLock;

use nscat_core::Amount;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// A point followed by exactly three digits and a word boundary is a
/// thousands separator.
static THOUSANDS_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(\d{3})\b").expect("valid thousands-separator regex"));

/// Normalizes a wholesale price cell.
///
/// Spaces (including non-breaking ones) are removed. When the value has a
/// comma and no point, the comma is the decimal separator. Otherwise points
/// followed by a three-digit group are dropped as thousands separators and
/// any remaining comma becomes the decimal point. Values that still do not
/// parse are kept as text. Blank input yields `None`.
#[must_use]
pub fn normalize_wholesale(raw: &str) -> Option<Amount> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{00A0}')
        .collect();
    if compact.is_empty() {
        return None;
    }

    let normalized = if compact.contains(',') && !compact.contains('.') {
        compact.replace(',', ".")
    } else {
        THOUSANDS_POINT
            .replace_all(&compact, "$1")
            .replace(',', ".")
    };

    Some(match parse_decimal(&normalized) {
        Some(d) => Amount::Decimal(d),
        None => Amount::Text(normalized),
    })
}

/// Converts a kilogram weight to whole grams, rounding half away from zero.
///
/// The value is read from its textual form so that `0.0005` is exactly half
/// a gram (and rounds to `1`). Non-numeric values yield `None`.
#[must_use]
pub fn kg_to_grams(kg: &Value) -> Option<i64> {
    let kg = match kg {
        Value::Number(n) => parse_decimal(&n.to_string())?,
        Value::String(s) => parse_decimal(s.trim())?,
        _ => return None,
    };
    let grams = kg
        .checked_mul(Decimal::ONE_THOUSAND)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    grams.to_i64()
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

//! Column sets and cell rendering for the exported CSV files.

use std::sync::LazyLock;

use nscat_core::{ExportLayout, MergedRecord};
use regex::Regex;
use serde_json::Value;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const BRAND_HEADER: [&str; 6] = ["SKU", "Title", "Stock", "PriceWholesale", "Price", "Weight"];

const FULL_HEADER: [&str; 11] = [
    "SKU",
    "Title",
    "Manufacturer",
    "Category",
    "Description",
    "Images",
    "Stock",
    "PriceWholesale",
    "Price",
    "WeightKg",
    "Weight",
];

#[must_use]
pub fn header(layout: ExportLayout) -> &'static [&'static str] {
    match layout {
        ExportLayout::Brand => &BRAND_HEADER,
        ExportLayout::Full => &FULL_HEADER,
    }
}

/// Cells of one record, in the column order of [`header`].
#[must_use]
pub fn row(record: &MergedRecord, layout: ExportLayout) -> Vec<String> {
    let text = |s: &Option<String>| s.as_deref().map(collapse_whitespace).unwrap_or_default();
    let value = |v: &Option<Value>| v.as_ref().map(cell_text).unwrap_or_default();
    let wholesale = record
        .price_wholesale
        .as_ref()
        .map(|a| collapse_whitespace(&a.to_string()))
        .unwrap_or_default();
    let grams = record.weight_grams.map(|g| g.to_string()).unwrap_or_default();

    match layout {
        ExportLayout::Brand => vec![
            collapse_whitespace(record.code.as_str()),
            text(&record.name),
            value(&record.stock),
            wholesale,
            value(&record.price),
            grams,
        ],
        ExportLayout::Full => vec![
            collapse_whitespace(record.code.as_str()),
            text(&record.name),
            text(&record.manufacturer),
            text(&record.category),
            text(&record.description),
            text(&record.images),
            value(&record.stock),
            wholesale,
            value(&record.price),
            value(&record.weight),
            grams,
        ],
    }
}

/// Renders a JSON value for a CSV cell: strings with whitespace runs
/// collapsed, numbers in their received spelling, structured values as
/// JSON text, `null` as empty.
#[must_use]
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => collapse_whitespace(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").into_owned()
}

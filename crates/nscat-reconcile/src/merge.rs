//! Merge-by-key over the catalog, stock, price, wholesale and unit datasets.

use std::collections::HashMap;

use nscat_core::{Amount, CsvRow, JsonRecord, MergedRecord, ProductCode};
use serde_json::Value;

use crate::alias;
use crate::numeric::{kg_to_grams, normalize_wholesale};

/// Unit code whose row carries the canonical weight.
const PREFERRED_UNIT: &str = "Unidad";

/// Joins the datasets into one record per catalog product.
///
/// Records keep the order in which their code first appeared in the
/// catalog. A repeated catalog code replaces the earlier record in place.
/// For stock, retail price and wholesale price the last entry for a code
/// wins. Entries whose code has no catalog record are ignored. The function
/// is pure: identical inputs always give identical output.
#[must_use]
pub fn merge(
    catalog: &[JsonRecord],
    stock: &[JsonRecord],
    units_of_measure: &[JsonRecord],
    prices: &[JsonRecord],
    wholesale: Option<&[CsvRow]>,
) -> Vec<MergedRecord> {
    let mut records: Vec<MergedRecord> = Vec::with_capacity(catalog.len());
    let mut index: HashMap<ProductCode, usize> = HashMap::with_capacity(catalog.len());
    let mut skipped = 0usize;

    for row in catalog {
        let Some(code) = alias::product_code(row) else {
            skipped += 1;
            continue;
        };
        let record = catalog_record(code.clone(), row);
        match index.get(&code) {
            Some(&pos) => records[pos] = record,
            None => {
                index.insert(code, records.len());
                records.push(record);
            }
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "catalog rows without a product code");
    }

    let stock_by_code = last_value_by_code(stock, alias::STOCK);
    let price_by_code = last_value_by_code(prices, alias::RETAIL_PRICE);
    let wholesale_by_code = wholesale.map(wholesale_prices).unwrap_or_default();
    let units_by_code = group_by_code(units_of_measure);

    for record in &mut records {
        let code = &record.code;
        record.stock = stock_by_code.get(code).cloned().flatten();
        record.price = price_by_code.get(code).cloned().flatten();
        record.price_wholesale = wholesale_by_code.get(code).cloned();

        if let Some(unit) = units_by_code.get(code).and_then(|rows| select_unit(rows)) {
            if let Some(weight) = alias::lookup(unit, alias::WEIGHT) {
                record.weight_grams = kg_to_grams(weight);
                record.weight = Some(weight.clone());
            }
        }
    }

    let orphans = [
        ("stock", count_orphans(stock_by_code.keys(), &index)),
        ("prices", count_orphans(price_by_code.keys(), &index)),
        ("wholesale", count_orphans(wholesale_by_code.keys(), &index)),
        ("units_of_measure", count_orphans(units_by_code.keys(), &index)),
    ];
    for (dataset, count) in orphans {
        if count > 0 {
            tracing::debug!(dataset, count, "entries without a catalog product ignored");
        }
    }

    tracing::info!(records = records.len(), "datasets merged");
    records
}

/// Chooses the unit row whose code equals [`PREFERRED_UNIT`] ignoring case,
/// else the first row.
#[must_use]
pub fn select_unit<'a>(rows: &[&'a JsonRecord]) -> Option<&'a JsonRecord> {
    rows.iter()
        .copied()
        .find(|row| {
            alias::lookup_text(row, alias::UOM_CODE)
                .is_some_and(|code| code.eq_ignore_ascii_case(PREFERRED_UNIT))
        })
        .or_else(|| rows.first().copied())
}

fn catalog_record(code: ProductCode, row: &JsonRecord) -> MergedRecord {
    let mut attributes = row.clone();
    let images = alias::lookup_entry(row, alias::IMAGES).and_then(|(key, value)| {
        let joined = join_images(value)?;
        if value.is_array() {
            attributes.insert(key.to_owned(), Value::String(joined.clone()));
        }
        Some(joined)
    });

    let mut record = MergedRecord::from_catalog(code, attributes);
    record.name = alias::lookup_text(row, alias::NAME);
    record.manufacturer = alias::lookup_text(row, alias::MANUFACTURER);
    record.category = alias::lookup_text(row, alias::CATEGORY);
    record.description = alias::lookup_text(row, alias::DESCRIPTION);
    record.images = images;
    record
}

/// A list of images flattens to a `|`-joined string; a single string is
/// kept as is.
fn join_images(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join("|"),
        ),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Maps each code to the value of its last entry. An entry without the
/// field still overrides earlier ones, with `None`.
fn last_value_by_code(rows: &[JsonRecord], field: &[&str]) -> HashMap<ProductCode, Option<Value>> {
    rows.iter()
        .filter_map(|row| {
            let code = alias::product_code(row)?;
            Some((code, alias::lookup(row, field).cloned()))
        })
        .collect()
}

fn wholesale_prices(rows: &[CsvRow]) -> HashMap<ProductCode, Amount> {
    rows.iter()
        .filter_map(|row| {
            let code = alias::csv_code(row)?;
            let amount = normalize_wholesale(alias::csv_wholesale(row)?)?;
            Some((code, amount))
        })
        .collect()
}

fn group_by_code(rows: &[JsonRecord]) -> HashMap<ProductCode, Vec<&JsonRecord>> {
    let mut grouped: HashMap<ProductCode, Vec<&JsonRecord>> = HashMap::new();
    for row in rows {
        if let Some(code) = alias::product_code(row) {
            grouped.entry(code).or_default().push(row);
        }
    }
    grouped
}

fn count_orphans<'a>(
    codes: impl Iterator<Item = &'a ProductCode>,
    index: &HashMap<ProductCode, usize>,
) -> usize {
    codes.filter(|code| !index.contains_key(*code)).count()
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;

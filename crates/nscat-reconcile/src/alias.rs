//! Ordered field-name alias tables, resolved by one shared lookup.
//!
//! Each table lists the upstream spellings of one logical field, most
//! specific first. Matching ignores ASCII case; an exact-case key wins over
//! a case-folded one for the same alias. `null` values are skipped so a
//! later alias can still supply the field.

use nscat_core::{CsvRow, JsonRecord, ProductCode};
use serde_json::Value;

pub const CODE: &[&str] = &["itemCode", "sku", "codigo", "reference", "code"];
pub const NAME: &[&str] = &["productName", "name", "title", "nombre"];
pub const MANUFACTURER: &[&str] = &["manufacturer", "brand", "fabricante", "marca"];
pub const CATEGORY: &[&str] = &["category", "categoria", "family"];
pub const DESCRIPTION: &[&str] = &["description", "descripcion", "longDescription"];
pub const IMAGES: &[&str] = &["images", "imagenes", "image"];
pub const STOCK: &[&str] = &["stock", "quantity", "qty", "existencias"];
pub const RETAIL_PRICE: &[&str] = &["pvp", "price"];
pub const UOM_CODE: &[&str] = &["uomCode", "unidadMedida", "unit", "uom"];
pub const WEIGHT: &[&str] = &["weight", "peso", "weightKg"];

/// Key column of the wholesale CSV.
pub const CSV_CODE: &[&str] = &["itemcode", "sku", "codigo", "reference"];
/// Value column of the wholesale CSV.
pub const CSV_WHOLESALE: &[&str] = &["pvp", "price_wholesale", "wholesale"];

/// The alias and key that matched, with the non-null value found there.
#[must_use]
pub fn lookup_entry<'a>(record: &'a JsonRecord, aliases: &[&str]) -> Option<(&'a str, &'a Value)> {
    aliases.iter().find_map(|alias| {
        record
            .get_key_value(*alias)
            .filter(|(_, v)| !v.is_null())
            .or_else(|| {
                record
                    .iter()
                    .find(|(k, v)| k.eq_ignore_ascii_case(alias) && !v.is_null())
            })
            .map(|(k, v)| (k.as_str(), v))
    })
}

/// First non-null value under any alias.
#[must_use]
pub fn lookup<'a>(record: &'a JsonRecord, aliases: &[&str]) -> Option<&'a Value> {
    lookup_entry(record, aliases).map(|(_, v)| v)
}

/// Like [`lookup`], rendered as trimmed, non-empty text. Strings are taken
/// as-is, numbers and booleans in their JSON spelling; structured values
/// are not text and yield `None`.
#[must_use]
pub fn lookup_text(record: &JsonRecord, aliases: &[&str]) -> Option<String> {
    lookup(record, aliases).and_then(scalar_text)
}

#[must_use]
pub fn product_code(record: &JsonRecord) -> Option<ProductCode> {
    lookup(record, CODE).and_then(ProductCode::from_value)
}

/// First wholesale CSV cell, by alias, once trimmed and non-empty.
#[must_use]
pub fn csv_code(row: &CsvRow) -> Option<ProductCode> {
    CSV_CODE
        .iter()
        .filter_map(|alias| row.get_ignore_case(alias))
        .find_map(ProductCode::new)
}

/// Value of the first wholesale column present in the header, even when
/// that cell is empty. A later alias does not stand in for an empty cell.
#[must_use]
pub fn csv_wholesale(row: &CsvRow) -> Option<&str> {
    CSV_WHOLESALE
        .iter()
        .find(|alias| row.has_column(alias))
        .and_then(|alias| row.get_ignore_case(alias))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

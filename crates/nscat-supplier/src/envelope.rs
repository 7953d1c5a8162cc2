//! Unwraps dataset responses to a flat list of JSON objects.
//!
//! Responses arrive either as a bare array or as an object wrapping the
//! array under one of several keys. Keys are tried in a fixed order: the
//! generic ones first, then the dataset-specific ones from
//! [`Endpoint::envelope_keys`]. A wrapper holding an object rather than an
//! array is unwrapped one further level with the same key order; when that
//! level holds no list either, the next key is tried.

use nscat_core::JsonRecord;
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::error::SupplierError;

const GENERIC_KEYS: [&str; 4] = ["data", "items", "result", "results"];

/// Extracts the record list from `payload`.
///
/// Array elements that are not JSON objects are dropped.
///
/// # Errors
///
/// Returns [`SupplierError::DataFormat`] when no array can be found.
pub fn unwrap_records(endpoint: Endpoint, payload: Value) -> Result<Vec<JsonRecord>, SupplierError> {
    let list = match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => match find_list(endpoint, &mut obj, true) {
            Some(items) => items,
            None => {
                let body = Value::Object(obj).to_string();
                return Err(SupplierError::data_format(
                    endpoint.name(),
                    "no record list in response object",
                    &body,
                ));
            }
        },
        other => {
            return Err(SupplierError::data_format(
                endpoint.name(),
                "expected a JSON array or object",
                &other.to_string(),
            ))
        }
    };

    let total = list.len();
    let records: Vec<JsonRecord> = list
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(obj),
            _ => None,
        })
        .collect();
    if records.len() < total {
        tracing::debug!(
            endpoint = endpoint.name(),
            dropped = total - records.len(),
            "discarded non-object list elements"
        );
    }
    Ok(records)
}

/// Takes the first wrapped list found, leaving `obj` untouched otherwise.
fn find_list(endpoint: Endpoint, obj: &mut JsonRecord, descend: bool) -> Option<Vec<Value>> {
    for key in GENERIC_KEYS.iter().chain(endpoint.envelope_keys()) {
        match obj.get_mut(*key) {
            Some(Value::Array(items)) => return Some(std::mem::take(items)),
            Some(Value::Object(inner)) if descend => {
                if let Some(items) = find_list(endpoint, inner, false) {
                    return Some(items);
                }
            }
            _ => {}
        }
    }
    None
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One object from a JSON dataset, keyed by the upstream's field names.
pub type JsonRecord = serde_json::Map<String, Value>;

/// Product identifier joining the catalog, stock, price and unit datasets.
///
/// Never empty: construction goes through [`ProductCode::new`] or
/// [`ProductCode::from_value`], both of which reject blank input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Upstream codes arrive as strings or as bare JSON numbers.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Number(n) => Self::new(&n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A price that was locale-normalized when possible.
///
/// Values that do not parse as a number after normalization are kept
/// verbatim rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amount {
    Decimal(Decimal),
    Text(String),
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Decimal(d) => write!(f, "{d}"),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One row of a delimited-text dataset, cells paired with their trimmed
/// header names in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    cells: Vec<(String, Option<String>)>,
}

impl CsvRow {
    #[must_use]
    pub fn new(cells: Vec<(String, Option<String>)>) -> Self {
        Self { cells }
    }

    /// Looks a column up by header, ignoring ASCII case. The first matching
    /// column wins when a header repeats.
    #[must_use]
    pub fn get_ignore_case(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(header))
            .and_then(|(_, v)| v.as_deref())
    }

    #[must_use]
    pub fn has_column(&self, header: &str) -> bool {
        self.cells.iter().any(|(h, _)| h.eq_ignore_ascii_case(header))
    }
}

/// A catalog product joined with its stock, prices and weight.
///
/// Fields a contributing dataset did not supply stay `None`; nothing is
/// defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub code: ProductCode,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Image URLs joined with `|`.
    pub images: Option<String>,
    /// Every field of the catalog object, as received.
    pub attributes: JsonRecord,
    pub stock: Option<Value>,
    /// Retail price (`pvp`).
    pub price: Option<Value>,
    pub price_wholesale: Option<Amount>,
    /// Weight in kilograms of the selected unit row, as received.
    pub weight: Option<Value>,
    pub weight_grams: Option<i64>,
}

impl MergedRecord {
    /// Starts a record carrying only catalog data.
    #[must_use]
    pub fn from_catalog(code: ProductCode, attributes: JsonRecord) -> Self {
        Self {
            code,
            name: None,
            manufacturer: None,
            category: None,
            description: None,
            images: None,
            attributes,
            stock: None,
            price: None,
            price_wholesale: None,
            weight: None,
            weight_grams: None,
        }
    }

    /// Case-insensitive, whitespace-tolerant manufacturer comparison.
    #[must_use]
    pub fn is_manufactured_by(&self, manufacturer: &str) -> bool {
        self.manufacturer
            .as_deref()
            .is_some_and(|m| m.trim().to_lowercase() == manufacturer.trim().to_lowercase())
    }
}

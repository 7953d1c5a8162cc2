//! Joins the supplier datasets into one record per catalog product.
//!
//! The catalog is authoritative for which products exist: stock, price,
//! wholesale and unit-of-measure entries only decorate records the catalog
//! already produced. Field names are resolved through the alias tables in
//! [`alias`]; numbers through [`numeric`].

pub mod alias;
pub mod merge;
pub mod numeric;

pub use merge::merge;
pub use numeric::{kg_to_grams, normalize_wholesale};

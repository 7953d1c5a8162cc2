//! Client for the Natural Systems supplier API.
//!
//! Logs in with an API key, caches the bearer token between runs, and pulls
//! the catalog, stock, price, unit-of-measure and wholesale-CSV datasets.
//! An expired token (HTTP 401) is refreshed once per fetch; the catalog
//! endpoint additionally retries with back-off.

pub mod auth;
pub mod client;
pub mod csv_rows;
pub mod datasets;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod retry;
pub mod token_cache;

pub use auth::{AuthToken, Authenticator};
pub use client::SupplierClient;
pub use datasets::{DatasetFetcher, Datasets};
pub use endpoint::Endpoint;
pub use error::SupplierError;
pub use retry::RetryPolicy;
pub use token_cache::{CachedToken, TokenCache};

use nscat_core::ConfigError;
use nscat_supplier::SupplierError;
use thiserror::Error;

/// Failures that abort a whole run. Export and upload problems are reported
/// per file instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("fetching supplier data failed: {0}")]
    Fetch(#[from] SupplierError),
}

impl RunError {
    /// True when the run could not authenticate against the supplier.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, RunError::Fetch(e) if e.is_auth())
    }
}

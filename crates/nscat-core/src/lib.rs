//! Shared domain types and configuration for the Natural Systems catalog
//! runner.

pub mod app_config;
pub mod config;
pub mod record;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ExportLayout};
pub use config::{load_app_config, load_app_config_from_env};
pub use record::{Amount, CsvRow, JsonRecord, MergedRecord, ProductCode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

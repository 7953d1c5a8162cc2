use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Column set written to each per-manufacturer CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportLayout {
    /// `SKU, Title, Stock, PriceWholesale, Price, Weight`.
    #[default]
    Brand,
    /// The brand columns plus the descriptive catalog attributes.
    Full,
}

impl std::str::FromStr for ExportLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brand" => Ok(Self::Brand),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown export layout '{other}' (expected brand or full)")),
        }
    }
}

impl std::fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportLayout::Brand => write!(f, "brand"),
            ExportLayout::Full => write!(f, "full"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub bind_addr: SocketAddr,
    pub api_key: String,
    pub api_base_url: String,
    pub catalog_lang: i64,
    pub output_dir: PathBuf,
    pub token_cache_path: PathBuf,
    pub token_validity_secs: u64,
    pub token_safety_margin_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub catalog_max_attempts: u32,
    pub catalog_backoff_ms: Vec<u64>,
    pub wholesale_enabled: bool,
    pub manufacturers: Vec<String>,
    pub export_layout: ExportLayout,
    pub run_secret: Option<String>,
    pub drive_folder_id: Option<String>,
    pub google_credentials_path: PathBuf,
    pub google_credentials_json: Option<String>,
}

impl AppConfig {
    /// Returns the shared invocation secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `RUN_SECRET` is unset or blank.
    pub fn require_run_secret(&self) -> Result<&str, ConfigError> {
        self.run_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("RUN_SECRET".to_string()))
    }

    /// Returns the upload destination folder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DRIVE_FOLDER_ID` is unset or blank.
    pub fn require_drive_folder_id(&self) -> Result<&str, ConfigError> {
        self.drive_folder_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DRIVE_FOLDER_ID".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("bind_addr", &self.bind_addr)
            .field("api_key", &"[redacted]")
            .field("api_base_url", &self.api_base_url)
            .field("catalog_lang", &self.catalog_lang)
            .field("output_dir", &self.output_dir)
            .field("token_cache_path", &self.token_cache_path)
            .field("token_validity_secs", &self.token_validity_secs)
            .field("token_safety_margin_secs", &self.token_safety_margin_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("catalog_max_attempts", &self.catalog_max_attempts)
            .field("catalog_backoff_ms", &self.catalog_backoff_ms)
            .field("wholesale_enabled", &self.wholesale_enabled)
            .field("manufacturers", &self.manufacturers)
            .field("export_layout", &self.export_layout)
            .field("run_secret", &self.run_secret.as_ref().map(|_| "[redacted]"))
            .field("drive_folder_id", &self.drive_folder_id)
            .field("google_credentials_path", &self.google_credentials_path)
            .field(
                "google_credentials_json",
                &self.google_credentials_json.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

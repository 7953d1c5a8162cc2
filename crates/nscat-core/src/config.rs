use crate::app_config::{AppConfig, Environment, ExportLayout};
use crate::ConfigError;

const DEFAULT_MANUFACTURERS: &str = "Milwaukee,Garden HighPro,Qnubu,Zerum";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup.
pub(crate) fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let api_key = lookup("NATURALSYSTEMS_API_KEY")
        .map(|raw| clean_api_key(&raw))
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar("NATURALSYSTEMS_API_KEY".to_string()))?;

    let env = parse_environment(&or_default("NSCAT_ENV", "development"))?;
    let log_level = or_default("NSCAT_LOG_LEVEL", "info");

    let bind_addr = or_default("NSCAT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("NSCAT_BIND_ADDR", e.to_string()))?;

    let api_base_url = or_default("NSCAT_API_BASE_URL", "https://api.naturalsystems.es/api")
        .trim()
        .trim_end_matches('/')
        .to_string();
    if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
        return Err(invalid(
            "NSCAT_API_BASE_URL",
            format!("'{api_base_url}' is not an http(s) URL"),
        ));
    }

    let catalog_lang = or_default("NSCAT_CATALOG_LANG", "2")
        .trim()
        .parse::<i64>()
        .map_err(|e| invalid("NSCAT_CATALOG_LANG", e.to_string()))?;

    let output_dir = PathBuf::from(or_default("NSCAT_OUTPUT_DIR", "./output"));
    let token_cache_path = optional("NSCAT_TOKEN_CACHE_PATH")
        .map_or_else(|| output_dir.join(".token_cache.json"), PathBuf::from);

    let token_validity_secs = parse_u64("NSCAT_TOKEN_VALIDITY_SECS", "86400")?;
    let token_safety_margin_secs = parse_u64("NSCAT_TOKEN_SAFETY_MARGIN_SECS", "3600")?;
    if token_safety_margin_secs >= token_validity_secs {
        return Err(invalid(
            "NSCAT_TOKEN_SAFETY_MARGIN_SECS",
            format!(
                "margin {token_safety_margin_secs}s must be below validity {token_validity_secs}s"
            ),
        ));
    }

    let request_timeout_secs = parse_u64("NSCAT_REQUEST_TIMEOUT_SECS", "60")?;
    let connect_timeout_secs = parse_u64("NSCAT_CONNECT_TIMEOUT_SECS", "20")?;

    let catalog_max_attempts = or_default("NSCAT_CATALOG_MAX_ATTEMPTS", "3")
        .trim()
        .parse::<u32>()
        .map_err(|e| invalid("NSCAT_CATALOG_MAX_ATTEMPTS", e.to_string()))?;
    if catalog_max_attempts == 0 {
        return Err(invalid(
            "NSCAT_CATALOG_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let catalog_backoff_ms = parse_backoff(&or_default("NSCAT_CATALOG_BACKOFF_MS", "500,1000,2000"))
        .map_err(|reason| invalid("NSCAT_CATALOG_BACKOFF_MS", reason))?;

    let wholesale_enabled = parse_bool(&or_default("NSCAT_WHOLESALE_ENABLED", "true"))
        .map_err(|reason| invalid("NSCAT_WHOLESALE_ENABLED", reason))?;

    let manufacturers = parse_list(&or_default("NSCAT_MANUFACTURERS", DEFAULT_MANUFACTURERS));
    if manufacturers.is_empty() {
        return Err(invalid(
            "NSCAT_MANUFACTURERS",
            "at least one manufacturer is required".to_string(),
        ));
    }

    let export_layout = or_default("NSCAT_EXPORT_LAYOUT", "brand")
        .parse::<ExportLayout>()
        .map_err(|reason| invalid("NSCAT_EXPORT_LAYOUT", reason))?;

    let google_credentials_path = PathBuf::from(or_default(
        "GOOGLE_APPLICATION_CREDENTIALS",
        "/etc/secrets/gcp-key.json",
    ));

    Ok(AppConfig {
        env,
        log_level,
        bind_addr,
        api_key,
        api_base_url,
        catalog_lang,
        output_dir,
        token_cache_path,
        token_validity_secs,
        token_safety_margin_secs,
        request_timeout_secs,
        connect_timeout_secs,
        catalog_max_attempts,
        catalog_backoff_ms,
        wholesale_enabled,
        manufacturers,
        export_layout,
        run_secret: optional("RUN_SECRET"),
        drive_folder_id: optional("DRIVE_FOLDER_ID"),
        google_credentials_path,
        google_credentials_json: optional("GOOGLE_CREDENTIALS_JSON"),
    })
}

/// Strips whitespace and stray quoting that deployment dashboards tend to
/// leave around pasted keys.
fn clean_api_key(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | ' ' | '\t' | '\n' | '\r'))
        .to_string()
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "NSCAT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_backoff(raw: &str) -> Result<Vec<u64>, String> {
    let delays = parse_list(raw)
        .iter()
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| format!("'{s}' is not a millisecond count: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if delays.is_empty() {
        return Err("at least one delay is required".to_string());
    }
    Ok(delays)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

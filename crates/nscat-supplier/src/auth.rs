//! API-key login and bearer-token lifecycle.

use chrono::{DateTime, TimeDelta, Utc};
use nscat_core::AppConfig;
use serde_json::Value;

use crate::client::SupplierClient;
use crate::error::SupplierError;
use crate::token_cache::{CachedToken, TokenCache};

const TOKEN_KEYS: [&str; 4] = ["token", "access_token", "accessToken", "jwt"];
const NESTED_KEYS: [&str; 2] = ["data", "result"];

/// A bearer token and the instant after which it must not be reused.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    #[must_use]
    pub fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<CachedToken> for AuthToken {
    fn from(cached: CachedToken) -> Self {
        Self::new(cached.token, cached.expires_at)
    }
}

impl From<&AuthToken> for CachedToken {
    fn from(token: &AuthToken) -> Self {
        CachedToken {
            token: token.value.clone(),
            expires_at: token.expires_at,
        }
    }
}

/// Hands out bearer tokens, preferring the on-disk cache over a login call.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: SupplierClient,
    api_key: String,
    cache: TokenCache,
    validity_secs: u64,
    safety_margin_secs: u64,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        client: SupplierClient,
        api_key: impl Into<String>,
        cache: TokenCache,
        validity_secs: u64,
        safety_margin_secs: u64,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            cache,
            validity_secs,
            safety_margin_secs,
        }
    }

    #[must_use]
    pub fn from_config(client: SupplierClient, config: &AppConfig) -> Self {
        Self::new(
            client,
            config.api_key.clone(),
            TokenCache::new(config.token_cache_path.clone()),
            config.token_validity_secs,
            config.token_safety_margin_secs,
        )
    }

    /// Returns the cached token while it is unexpired, otherwise logs in.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Authenticator::refresh_token`].
    pub async fn get_token(&self) -> Result<AuthToken, SupplierError> {
        if let Some(cached) = self.cache.load() {
            if cached.is_valid_at(Utc::now()) {
                tracing::debug!(expires_at = %cached.expires_at, "reusing cached token");
                return Ok(cached.into());
            }
            tracing::info!(expires_at = %cached.expires_at, "cached token expired");
        }
        self.refresh_token().await
    }

    /// Logs in unconditionally, bypassing the cache, and stores the new token.
    ///
    /// # Errors
    ///
    /// - [`SupplierError::LoginFailed`] if the login call is rejected.
    /// - [`SupplierError::TokenMissing`] if the response carries no token.
    /// - [`SupplierError::Network`] on transport failure.
    /// - [`SupplierError::InvalidConfig`] if the configured validity cannot be
    ///   represented as a timestamp.
    pub async fn refresh_token(&self) -> Result<AuthToken, SupplierError> {
        let body = self.client.login(&self.api_key).await?;
        let value = extract_token(&body).ok_or(SupplierError::TokenMissing)?;

        let now = Utc::now();
        let stated = stated_validity_secs(&body)
            .and_then(|secs| expiry_after(now, secs.saturating_sub(self.safety_margin_secs)));
        let expires_at = match stated {
            Some(at) => at,
            None => expiry_after(now, self.validity_secs.saturating_sub(self.safety_margin_secs))
                .ok_or_else(|| {
                    SupplierError::InvalidConfig(format!(
                        "token validity of {}s is out of range",
                        self.validity_secs
                    ))
                })?,
        };
        let token = AuthToken::new(value, expires_at);

        self.cache.store(&CachedToken::from(&token));
        tracing::info!(expires_at = %token.expires_at, "obtained new token");
        Ok(token)
    }
}

/// Finds the token in a login response: a known key at the top level, or
/// the same keys nested under `data` or `result`.
#[must_use]
pub fn extract_token(body: &Value) -> Option<String> {
    token_field(body).or_else(|| {
        NESTED_KEYS
            .iter()
            .filter_map(|k| body.get(k))
            .find_map(token_field)
    })
}

fn token_field(obj: &Value) -> Option<String> {
    TOKEN_KEYS
        .iter()
        .filter_map(|k| obj.get(k).and_then(Value::as_str))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(ToOwned::to_owned)
}

/// `now + secs`, or `None` when the instant is not representable. A stated
/// lifetime that fails here falls back to the configured validity.
fn expiry_after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    now.checked_add_signed(TimeDelta::try_seconds(secs)?)
}

/// `expires_in` seconds, when the login response states one.
fn stated_validity_secs(body: &Value) -> Option<u64> {
    std::iter::once(body)
        .chain(NESTED_KEYS.iter().filter_map(|k| body.get(k)))
        .filter_map(|obj| obj.get("expires_in"))
        .find_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

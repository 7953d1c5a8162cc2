//! On-disk cache of the bearer token, shared between runs.
//!
//! The record is a small JSON object `{ "token": "...", "expires_at": "<RFC3339>" }`.
//! A missing, unreadable or malformed cache reads as absent; a failed write
//! is logged and otherwise ignored. Concurrent runs may race on the file,
//! which costs at most one redundant login.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// A token is usable while `now < expires_at`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the cached record, if there is a usable one on disk.
    #[must_use]
    pub fn load(&self) -> Option<CachedToken> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token cache unreadable");
                return None;
            }
        };
        match serde_json::from_str::<CachedToken>(&raw) {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token cache malformed");
                None
            }
        }
    }

    /// Writes the record, creating the parent directory when needed.
    pub fn store(&self, token: &CachedToken) {
        if let Err(e) = self.try_store(token) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not write token cache"
            );
        }
    }

    fn try_store(&self, token: &CachedToken) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(token).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("nested").join("token.json"));
        let token = CachedToken {
            token: "abc".to_owned(),
            expires_at: Utc::now() + Duration::hours(2),
        };
        cache.store(&token);
        assert_eq!(cache.load(), Some(token));
    }

    #[test]
    fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("absent.json"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn malformed_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(TokenCache::new(path).load().is_none());
    }

    #[test]
    fn validity_is_strictly_before_expiry() {
        let now = Utc::now();
        let token = CachedToken {
            token: "abc".to_owned(),
            expires_at: now,
        };
        assert!(!token.is_valid_at(now));
        assert!(token.is_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn empty_token_is_never_valid() {
        let now = Utc::now();
        let token = CachedToken {
            token: String::new(),
            expires_at: now + Duration::hours(1),
        };
        assert!(!token.is_valid_at(now));
    }
}

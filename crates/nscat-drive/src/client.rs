//! Google Drive v3 upload client authenticated with a service-account JWT.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use nscat_core::AppConfig;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::credentials::ServiceAccountKey;
use crate::error::{snippet, UploadError};
use crate::store::{FileStore, RemoteFileId};

const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com";
const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Access tokens are renewed this long before Google's stated expiry.
const TOKEN_EARLY_RENEWAL_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Uploads files to Drive folders as the configured service account.
///
/// The access token is obtained lazily on the first upload and reused until
/// shortly before it expires.
pub struct DriveClient {
    client: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    upload_base: String,
    token: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveClient")
            .field("service_account", &self.key.client_email)
            .field("upload_base", &self.upload_base)
            .finish_non_exhaustive()
    }
}

impl DriveClient {
    /// Loads the service-account key from the configuration and targets the
    /// public Drive API.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Credentials`] if no usable key is available.
    pub fn from_config(config: &AppConfig) -> Result<Self, UploadError> {
        let key = ServiceAccountKey::from_config(config)?;
        Self::with_base_url(
            key,
            DRIVE_UPLOAD_BASE,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Creates a client against a custom upload host (for testing with wiremock).
    /// The token endpoint always comes from the key's `token_uri`.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Credentials`] if the private key is not an RSA PEM.
    /// - [`UploadError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        key: ServiceAccountKey,
        upload_base: &str,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| UploadError::Credentials(format!("private key is not a usable RSA PEM: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nscat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            key,
            signing_key,
            upload_base: upload_base.trim_end_matches('/').to_owned(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, UploadError> {
        let mut guard = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = guard.as_ref().filter(|t| t.expires_at > now) {
            return Ok(token.value.clone());
        }
        let fresh = self.exchange_assertion(now).await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn exchange_assertion(&self, now: DateTime<Utc>) -> Result<AccessToken, UploadError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_FILE_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);
        let assertion = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| UploadError::Credentials(format!("cannot sign assertion: {e}")))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::info!(url = %self.key.token_uri, status = status.as_u16(), "drive token exchange");
        if !status.is_success() {
            return Err(UploadError::Credentials(format!(
                "token exchange rejected (HTTP {}): {}",
                status.as_u16(),
                snippet(&body)
            )));
        }
        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            UploadError::Credentials(format!("token response unreadable: {e}: {}", snippet(&body)))
        })?;
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: token_expiry(now, parsed.expires_in),
        })
    }
}

/// When a token issued at `now` must be renewed. A stated lifetime that is
/// not representable falls back to the assertion lifetime.
fn token_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let renew_after = |secs: i64| {
        TimeDelta::try_seconds(secs.saturating_sub(TOKEN_EARLY_RENEWAL_SECS).max(0))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
    };
    expires_in
        .and_then(renew_after)
        .or_else(|| renew_after(ASSERTION_LIFETIME_SECS))
        .unwrap_or(now)
}

/// Assembles a `multipart/related` body: JSON metadata, then the CSV media.
fn related_body(boundary: &str, metadata: &serde_json::Value, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: text/csv\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl FileStore for DriveClient {
    async fn upload_file(&self, local: &Path, folder_id: &str) -> Result<RemoteFileId, UploadError> {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::Io {
                path: local.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            })?;
        let media = tokio::fs::read(local).await.map_err(|source| UploadError::Io {
            path: local.to_path_buf(),
            source,
        })?;

        let token = self.access_token().await?;
        let boundary = format!("nscat-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let url = format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id,name,parents",
            self.upload_base
        );

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(related_body(&boundary, &metadata, &media))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::info!(file = %name, folder = %folder_id, status = status.as_u16(), "drive upload");

        if !status.is_success() {
            return Err(UploadError::Remote {
                operation: "upload",
                status: status.as_u16(),
                snippet: snippet(&body),
            });
        }
        let uploaded: UploadedFile = serde_json::from_str(&body).map_err(|_| UploadError::Remote {
            operation: "upload",
            status: status.as_u16(),
            snippet: snippet(&body),
        })?;
        Ok(RemoteFileId(uploaded.id))
    }
}

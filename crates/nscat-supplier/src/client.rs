//! Thin HTTP layer over `reqwest` for the supplier API.
//!
//! Maps HTTP statuses to [`SupplierError`] variants (200 is success, 401 is
//! [`SupplierError::Unauthorized`], anything else is
//! [`SupplierError::UpstreamStatus`]) and logs one line per exchange.

use std::time::Duration;

use nscat_core::AppConfig;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::error::{snippet, SupplierError};

const JSON_ACCEPT: &str = "application/json";
const CSV_ACCEPT: &str = "text/csv,*/*;q=0.8";
const LOGIN: &str = "login";

/// Client for the supplier REST API.
///
/// Use [`SupplierClient::new`] with the loaded configuration or
/// [`SupplierClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct SupplierClient {
    client: Client,
    base_url: String,
}

impl SupplierClient {
    /// Creates a client from the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError::InvalidConfig`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self, SupplierError> {
        Self::with_base_url(
            &config.api_base_url,
            config.request_timeout_secs,
            config.connect_timeout_secs,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError::InvalidConfig`] if the underlying
    /// `reqwest::Client` cannot be constructed or `base_url` is blank.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> Result<Self, SupplierError> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(SupplierError::InvalidConfig("empty API base URL".to_owned()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent(concat!("nscat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SupplierError::InvalidConfig(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Exchanges the API key for the raw login response body.
    ///
    /// # Errors
    ///
    /// - [`SupplierError::Network`] on transport failure.
    /// - [`SupplierError::LoginFailed`] when the status is not 200 or the
    ///   body is not JSON.
    pub async fn login(&self, api_key: &str) -> Result<Value, SupplierError> {
        let url = self.url(LOGIN);
        let request = self
            .client
            .post(&url)
            .header(ACCEPT, JSON_ACCEPT)
            .json(&serde_json::json!({ "apiKey": api_key }));

        let (status, body) = send(LOGIN, request).await?;
        let parsed = serde_json::from_str::<Value>(&body).ok();
        log_exchange("POST", &url, status, parsed.is_some());

        match parsed {
            Some(value) if status == StatusCode::OK => Ok(value),
            _ => Err(SupplierError::LoginFailed {
                status: status.as_u16(),
                snippet: snippet(&body),
            }),
        }
    }

    /// Sends an authenticated GET and parses the body as JSON.
    ///
    /// `body` is attached as a JSON payload even though the method is GET;
    /// `getCatalogo` reads its `lang` parameter from there.
    ///
    /// # Errors
    ///
    /// - [`SupplierError::Network`] on transport failure.
    /// - [`SupplierError::Unauthorized`] on HTTP 401.
    /// - [`SupplierError::UpstreamStatus`] on any other non-200 status.
    /// - [`SupplierError::DataFormat`] if the body is not JSON.
    pub async fn get_json(
        &self,
        endpoint: Endpoint,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, SupplierError> {
        let url = self.url(endpoint.path());
        let mut request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, JSON_ACCEPT);
        if let Some(body) = body {
            request = request.json(body);
        }

        let (status, text) = send(endpoint.name(), request).await?;
        let parsed = serde_json::from_str::<Value>(&text);
        log_exchange("GET", &url, status, parsed.is_ok());

        check_status(endpoint, status, &text)?;
        parsed.map_err(|e| SupplierError::data_format(endpoint.name(), format!("not JSON: {e}"), &text))
    }

    /// Sends an authenticated GET and returns the body as text.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`SupplierClient::get_json`]; the body is not
    /// parsed here.
    pub async fn get_text(&self, endpoint: Endpoint, token: &str) -> Result<String, SupplierError> {
        let url = self.url(endpoint.path());
        let request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, CSV_ACCEPT);

        let (status, text) = send(endpoint.name(), request).await?;
        log_exchange("GET", &url, status, false);

        check_status(endpoint, status, &text)?;
        Ok(text)
    }
}

async fn send(endpoint: &str, request: RequestBuilder) -> Result<(StatusCode, String), SupplierError> {
    let network = |source| SupplierError::Network {
        endpoint: endpoint.to_owned(),
        source,
    };
    let response = request.send().await.map_err(network)?;
    let status = response.status();
    let body = response.text().await.map_err(network)?;
    Ok((status, body))
}

fn check_status(endpoint: Endpoint, status: StatusCode, body: &str) -> Result<(), SupplierError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::UNAUTHORIZED => Err(SupplierError::Unauthorized {
            endpoint: endpoint.name().to_owned(),
        }),
        other => Err(SupplierError::UpstreamStatus {
            endpoint: endpoint.name().to_owned(),
            status: other.as_u16(),
            snippet: snippet(body),
        }),
    }
}

fn log_exchange(method: &str, url: &str, status: StatusCode, json: bool) {
    tracing::info!(
        method,
        url,
        status = status.as_u16(),
        body = if json { "json" } else { "text" },
        "supplier request completed"
    );
}

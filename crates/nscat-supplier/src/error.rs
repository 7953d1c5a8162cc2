use thiserror::Error;

/// Maximum number of body characters carried in an error for diagnostics.
pub const SNIPPET_CHARS: usize = 300;

/// Errors returned by the supplier API client.
#[derive(Debug, Error)]
pub enum SupplierError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("network error calling {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The login call did not return HTTP 200 with a JSON body.
    #[error("login failed (HTTP {status}): {snippet}")]
    LoginFailed { status: u16, snippet: String },

    /// The login response carried no recognizable token field.
    #[error("token not found in login response")]
    TokenMissing,

    /// The endpoint rejected the bearer token.
    #[error("{endpoint} returned HTTP 401")]
    Unauthorized { endpoint: String },

    /// The endpoint rejected a freshly issued token as well.
    #[error("{endpoint} rejected a freshly issued token (HTTP 401)")]
    TokenRejected { endpoint: String },

    /// Any non-200, non-401 status.
    #[error("{endpoint} HTTP {status}: {snippet}")]
    UpstreamStatus {
        endpoint: String,
        status: u16,
        snippet: String,
    },

    /// The body could not be read as the expected JSON or CSV structure.
    #[error("unexpected response format from {endpoint}: {reason}: {snippet}")]
    DataFormat {
        endpoint: String,
        reason: String,
        snippet: String,
    },

    /// Building the HTTP client or a request URL failed.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl SupplierError {
    /// True for the failures that mean the run cannot authenticate.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SupplierError::LoginFailed { .. }
                | SupplierError::TokenMissing
                | SupplierError::Unauthorized { .. }
                | SupplierError::TokenRejected { .. }
        )
    }

    pub(crate) fn data_format(endpoint: &str, reason: impl Into<String>, body: &str) -> Self {
        SupplierError::DataFormat {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
            snippet: snippet(body),
        }
    }
}

/// Truncates `body` to [`SNIPPET_CHARS`] characters, on a char boundary.
#[must_use]
pub fn snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

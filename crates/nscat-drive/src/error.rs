use std::path::PathBuf;

use thiserror::Error;

const SNIPPET_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum UploadError {
    /// The service-account key is missing or malformed, or the token
    /// exchange was refused.
    #[error("service account credentials unusable: {0}")]
    Credentials(String),

    #[error("drive {operation} failed (HTTP {status}): {snippet}")]
    Remote {
        operation: &'static str,
        status: u16,
        snippet: String,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("drive request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl UploadError {
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(self, UploadError::Credentials(_))
    }
}

pub(crate) fn snippet(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

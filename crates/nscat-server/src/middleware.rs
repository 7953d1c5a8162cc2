use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The shared secret callers pass as `?key=`.
#[derive(Clone)]
pub struct RunKey(Arc<str>);

impl std::fmt::Debug for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RunKey([redacted])")
    }
}

impl RunKey {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self(Arc::from(secret))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn allows(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

#[derive(Debug, Deserialize)]
struct KeyParam {
    key: Option<String>,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware rejecting requests whose `key` query parameter does not match
/// the run secret.
pub async fn require_run_key(State(key): State<RunKey>, req: Request, next: Next) -> Response {
    let supplied = Query::<KeyParam>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(p)| p.key);

    match supplied {
        Some(candidate) if key.allows(&candidate) => next.run(req).await,
        _ => {
            tracing::warn!(path = %req.uri().path(), "rejected request with missing or wrong key");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "ok": false, "error": "unauthorized" })),
            )
                .into_response()
        }
    }
}

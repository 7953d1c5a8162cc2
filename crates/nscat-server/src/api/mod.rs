mod files;
mod run;
mod upload;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use nscat_core::AppConfig;
use nscat_drive::FileStore;
use nscat_runner::{OutputPaths, RunContext, RunLogGuard, RunLogSink};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id, require_run_key, RequestId, RunKey};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Output directories as resolved at startup; `/files` serves from `paths.csv`.
    pub paths: OutputPaths,
    pub key: RunKey,
    /// Held for the whole of a run so runs never overlap.
    pub run_lock: Arc<Mutex<()>>,
    /// Replaces the Drive client built from the configuration.
    pub file_store: Option<Arc<dyn FileStore>>,
    /// Receives the events of the run in progress.
    pub run_logs: RunLogSink,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<AppConfig>, paths: OutputPaths, key: RunKey) -> Self {
        Self {
            config,
            paths,
            key,
            run_lock: Arc::new(Mutex::new(())),
            file_store: None,
            run_logs: RunLogSink::default(),
        }
    }

    #[must_use]
    pub fn with_run_logs(mut self, run_logs: RunLogSink) -> Self {
        self.run_logs = run_logs;
        self
    }

    /// Points the run log sink at `ctx.run_log` for as long as the guard lives.
    /// A run whose log cannot be opened still goes ahead.
    fn attach_run_log(&self, ctx: &RunContext) -> Option<RunLogGuard> {
        self.run_logs
            .attach(&ctx.run_log)
            .inspect_err(|e| tracing::warn!(run_id = %ctx.run_id, error = %e, "run log unavailable"))
            .ok()
    }
}

/// `{ "ok": false, "error": ..., ... }` with an HTTP status.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    ok: bool,
    error: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            ok: false,
            error: error.into(),
            extra: Map::new(),
        }
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Adds a field next to `error` in the body.
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.extra.insert(field.to_owned(), value);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    ok: bool,
    status: &'static str,
}

fn protected_router(key: RunKey) -> Router<AppState> {
    Router::new()
        .route("/run", get(run::run))
        .route("/files", get(files::serve_file))
        .route("/upload", get(upload::upload))
        .layer(axum::middleware::from_fn_with_state(key, require_run_key))
}

pub fn build_app(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(state.key.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    tracing::debug!(request_id = %req_id.0, "health check");
    Json(HealthData {
        ok: true,
        status: "ok",
    })
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

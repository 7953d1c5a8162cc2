use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Extension, Json,
};
use nscat_runner::{run_pipeline, RunContext};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use super::{ApiError, AppState};
use crate::middleware::{RequestId, RunKey};

/// RFC 3986 unreserved characters stay literal.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RunResponse {
    ok: bool,
    run_id: String,
    csv_count: usize,
    csv_files: Vec<String>,
    file_urls: Vec<String>,
    /// Manufacturers whose CSV could not be written.
    skipped: Vec<String>,
    run_log: String,
}

/// `scheme://host` of the request as the caller addressed it. The scheme is
/// `https` only when a proxy says so through `X-Forwarded-Proto`.
pub(super) fn public_base_url(headers: &HeaderMap) -> String {
    let https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    format!("{}://{host}", if https { "https" } else { "http" })
}

pub(super) fn file_url(base: &str, name: &str, key: &RunKey) -> String {
    format!(
        "{base}/files?name={}&key={}",
        utf8_percent_encode(name, QUERY_VALUE),
        utf8_percent_encode(key.as_str(), QUERY_VALUE)
    )
}

pub(super) async fn run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<RunResponse>, ApiError> {
    let _running = state.run_lock.lock().await;
    let ctx = RunContext::new(Arc::clone(&state.config));
    let _run_log = state.attach_run_log(&ctx);
    tracing::info!(request_id = %req_id.0, run_id = %ctx.run_id, "run requested");

    let summary = run_pipeline(&ctx).await.map_err(|e| {
        ApiError::internal(e.to_string())
            .with("runId", &ctx.run_id)
            .with("runLog", ctx.run_log_name())
    })?;

    let base = public_base_url(&headers);
    let csv_files: Vec<String> = summary
        .csv_files()
        .iter()
        .filter_map(|f| f.path.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    let file_urls = csv_files
        .iter()
        .map(|name| file_url(&base, name, &state.key))
        .collect();

    Ok(Json(RunResponse {
        ok: true,
        run_id: summary.run_id.clone(),
        csv_count: csv_files.len(),
        csv_files,
        file_urls,
        skipped: summary
            .export
            .failures
            .iter()
            .map(|f| f.group.clone())
            .collect(),
        run_log: ctx.run_log_name(),
    }))
}

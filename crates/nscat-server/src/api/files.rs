use std::sync::LazyLock;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::Deserialize;

use super::{ApiError, AppState};

static EXPORT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^brand_[A-Za-z0-9_]+\.csv$").expect("valid export-name regex"));

#[derive(Debug, Deserialize)]
pub(super) struct FileParams {
    name: Option<String>,
}

/// Only names the exporter could have produced are accepted, so the lookup
/// never leaves the CSV directory.
pub(super) fn is_export_name(name: &str) -> bool {
    EXPORT_NAME.is_match(name)
}

pub(super) async fn serve_file(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> Result<Response, ApiError> {
    let name = params
        .name
        .filter(|n| is_export_name(n))
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "invalid file name"))?;

    let path = state.paths.csv.join(&name);
    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, "file not found"));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "cannot read CSV");
            return Err(ApiError::internal("cannot read file"));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{name}\"")),
        ],
        body,
    )
        .into_response())
}

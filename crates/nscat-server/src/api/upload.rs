use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use nscat_drive::{DriveClient, FileStore, UploadDiagnostics};
use nscat_runner::{run_pipeline, upload_outputs, FailedUpload, RunContext, UploadedFile};
use serde::Serialize;
use tracing::Instrument;

use super::{ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UploadResponse {
    ok: bool,
    run_id: String,
    uploaded: Vec<UploadedFile>,
    failed: Vec<FailedUpload>,
    diag: UploadDiagnostics,
}

fn failure(error: impl Into<String>, diag: &UploadDiagnostics) -> ApiError {
    ApiError::internal(error)
        .with("diag", diag)
        .with("hint", diag.hint())
}

/// Runs the pipeline, then uploads every CSV it wrote. Any failed file makes
/// the response a 500 that still lists what did upload.
pub(super) async fn upload(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<UploadResponse>, ApiError> {
    let diag = UploadDiagnostics::from_config(&state.config);
    let folder = state
        .config
        .require_drive_folder_id()
        .map_err(|e| ApiError::internal(e.to_string()).with("diag", &diag))?
        .to_owned();

    let _running = state.run_lock.lock().await;
    let ctx = RunContext::new(Arc::clone(&state.config));
    let _run_log = state.attach_run_log(&ctx);
    tracing::info!(request_id = %req_id.0, run_id = %ctx.run_id, folder = %folder, "upload requested");

    let summary = run_pipeline(&ctx)
        .await
        .map_err(|e| failure(e.to_string(), &diag).with("runLog", ctx.run_log_name()))?;

    let store: Arc<dyn FileStore> = match &state.file_store {
        Some(store) => Arc::clone(store),
        None => Arc::new(DriveClient::from_config(&state.config).map_err(|e| failure(e.to_string(), &diag))?),
    };
    let report = upload_outputs(store.as_ref(), &summary.export.paths(), &folder)
        .instrument(ctx.span())
        .await;

    if !report.is_complete() {
        let message = format!(
            "{} of {} uploads failed",
            report.failed.len(),
            report.failed.len() + report.uploaded.len()
        );
        return Err(failure(message, &diag)
            .with("uploaded", &report.uploaded)
            .with("failed", &report.failed));
    }

    Ok(Json(UploadResponse {
        ok: true,
        run_id: ctx.run_id.clone(),
        uploaded: report.uploaded,
        failed: report.failed,
        diag,
    }))
}

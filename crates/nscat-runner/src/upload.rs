use std::path::{Path, PathBuf};

use nscat_drive::FileStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file: String,
    pub drive_file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpload {
    pub file: String,
    pub error: String,
    pub credentials: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedFile>,
    pub failed: Vec<FailedUpload>,
}

impl UploadReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Uploads each file in order. A failed file is recorded and the rest are
/// still attempted.
pub async fn upload_outputs<P>(store: &dyn FileStore, files: &[P], folder_id: &str) -> UploadReport
where
    P: AsRef<Path>,
{
    let mut report = UploadReport::default();
    for path in files {
        let path = path.as_ref();
        let file = display_name(path);
        match store.upload_file(path, folder_id).await {
            Ok(id) => {
                tracing::info!(file = %file, drive_file_id = %id, "uploaded");
                report.uploaded.push(UploadedFile {
                    file,
                    drive_file_id: id.0,
                });
            }
            Err(e) => {
                tracing::error!(file = %file, error = %e, credentials = e.is_credential_error(), "upload failed");
                report.failed.push(FailedUpload {
                    file,
                    error: e.to_string(),
                    credentials: e.is_credential_error(),
                });
            }
        }
    }
    report
}

/// The `brand_*.csv` files directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns the I/O error if `dir` cannot be listed.
pub fn existing_csvs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_export = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("brand_") && n.ends_with(".csv"));
        if is_export && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

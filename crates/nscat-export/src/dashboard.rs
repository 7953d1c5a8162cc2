//! Static HTML summary of the CSV files a run produced.

use std::path::{Path, PathBuf};

use askama::Template;
use chrono::{DateTime, Local};

use crate::error::ExportError;
use crate::writer::ExportedFile;

const DASHBOARD_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardEntry {
    /// Relative to the output root when the file lives under it.
    pub path: String,
    pub rows: usize,
}

impl DashboardEntry {
    #[must_use]
    pub fn from_file(file: &ExportedFile, output_root: &Path) -> Self {
        let path = file
            .path
            .strip_prefix(output_root)
            .unwrap_or(&file.path)
            .display()
            .to_string();
        Self {
            path,
            rows: file.rows,
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    title: &'a str,
    entries: &'a [DashboardEntry],
    run_id: &'a str,
    generated_at: String,
}

/// Renders `index.html` into `dir`, returning its path.
///
/// # Errors
///
/// - [`ExportError::Render`] if the template fails.
/// - [`ExportError::Dashboard`] if the file cannot be written.
pub fn render_dashboard(
    dir: &Path,
    output_root: &Path,
    run_id: &str,
    generated_at: DateTime<Local>,
    files: &[ExportedFile],
) -> Result<PathBuf, ExportError> {
    let entries: Vec<DashboardEntry> = files
        .iter()
        .map(|f| DashboardEntry::from_file(f, output_root))
        .collect();
    let html = DashboardTemplate {
        title: "Catalog Runner",
        entries: &entries,
        run_id,
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
    }
    .render()?;

    let path = dir.join(DASHBOARD_FILE);
    std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&path, html))
        .map_err(|source| ExportError::Dashboard {
            path: path.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), files = entries.len(), "dashboard written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn file(path: PathBuf, rows: usize) -> ExportedFile {
        ExportedFile {
            group: "Milwaukee".to_owned(),
            path,
            rows,
        }
    }

    #[test]
    fn lists_files_with_rows_and_run_id() {
        let root = tempfile::tempdir().unwrap();
        let files = vec![
            file(root.path().join("csv").join("brand_Milwaukee.csv"), 12),
            file(PathBuf::from("/elsewhere/brand_Zerum.csv"), 0),
        ];
        let at = Local.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();

        let path = render_dashboard(&root.path().join("dashboard"), root.path(), "20260301-093000", at, &files)
            .unwrap();
        let html = std::fs::read_to_string(path).unwrap();

        assert!(html.contains("brand_Milwaukee.csv</code>"));
        assert!(!html.contains(&root.path().display().to_string()));
        assert!(html.contains("brand_Zerum.csv</code>"));
        assert!(html.contains(">12<"));
        assert!(html.contains("Run: 20260301-093000"));
        assert!(html.contains("2026-03-01 09:30:00"));
    }

    #[test]
    fn empty_run_says_so() {
        let root = tempfile::tempdir().unwrap();
        let path = render_dashboard(root.path(), root.path(), "r", Local::now(), &[]).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("No CSV files were generated."));
    }

    #[test]
    fn write_failure_is_dashboard_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("dashboard");
        std::fs::write(&blocker, "x").unwrap();
        let err = render_dashboard(&blocker, root.path(), "r", Local::now(), &[]).unwrap_err();
        assert!(matches!(err, ExportError::Dashboard { .. }));
    }
}

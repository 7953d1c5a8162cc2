use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use nscat_core::AppConfig;
use nscat_export::resolve_dir;

use crate::logging::RUN_SPAN;

const CSV_FALLBACK: &str = "catalog-runner-csv";
const LOGS_FALLBACK: &str = "catalog-runner-logs";
const DASHBOARD_FALLBACK: &str = "catalog-runner-dashboard";
const APP_LOG: &str = "app.log";

/// Output directories under the configured root, each replaced by a
/// temp-dir fallback when it cannot be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub root: PathBuf,
    pub csv: PathBuf,
    pub logs: PathBuf,
    pub dashboard: PathBuf,
}

impl OutputPaths {
    #[must_use]
    pub fn resolve(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            csv: resolve_dir(&root.join("csv"), CSV_FALLBACK),
            logs: resolve_dir(&root.join("logs"), LOGS_FALLBACK),
            dashboard: resolve_dir(&root.join("dashboard"), DASHBOARD_FALLBACK),
        }
    }

    /// Log appended to by every run.
    #[must_use]
    pub fn app_log(&self) -> PathBuf {
        self.logs.join(APP_LOG)
    }
}

/// Everything one invocation needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Arc<AppConfig>,
    pub paths: OutputPaths,
    /// `YYYYmmdd-HHMMSS` in local time.
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub run_log: PathBuf,
}

impl RunContext {
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::starting_at(config, Local::now())
    }

    #[must_use]
    pub fn starting_at(config: Arc<AppConfig>, started_at: DateTime<Local>) -> Self {
        let paths = OutputPaths::resolve(&config.output_dir);
        let run_id = started_at.format("%Y%m%d-%H%M%S").to_string();
        let run_log = paths.logs.join(format!("run-{run_id}.log"));
        Self {
            config,
            paths,
            run_id,
            started_at,
            run_log,
        }
    }

    /// Span that scopes this run's events, so a per-run log can pick them out.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(RUN_SPAN, run_id = %self.run_id)
    }

    /// File name of the run log, as reported to callers.
    #[must_use]
    pub fn run_log_name(&self) -> String {
        self.run_log
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

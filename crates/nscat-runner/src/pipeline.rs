use std::path::PathBuf;

use chrono::Local;
use nscat_core::AppConfig;
use nscat_export::{render_dashboard, ExportReport, ExportedFile, Exporter};
use nscat_reconcile::merge;
use nscat_supplier::{
    Authenticator, DatasetFetcher, Datasets, RetryPolicy, SupplierClient, SupplierError,
};
use tracing::Instrument;

use crate::context::RunContext;
use crate::error::RunError;

/// Outcome of a run that got past the fetch stage.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub records: usize,
    pub export: ExportReport,
    /// `None` when the dashboard could not be written.
    pub dashboard: Option<PathBuf>,
    pub run_log: PathBuf,
}

impl RunSummary {
    #[must_use]
    pub fn csv_files(&self) -> &[ExportedFile] {
        &self.export.files
    }

    /// One-line human summary for the scheduled-job entry point.
    #[must_use]
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "OK run {}: {} products, {} CSV files",
            self.run_id,
            self.records,
            self.export.files.len()
        );
        if !self.export.failures.is_empty() {
            let groups: Vec<&str> = self
                .export
                .failures
                .iter()
                .map(|f| f.group.as_str())
                .collect();
            line.push_str(&format!(" ({} skipped: {})", groups.len(), groups.join(", ")));
        }
        line
    }
}

async fn fetch_datasets(config: &AppConfig) -> Result<Datasets, SupplierError> {
    let client = SupplierClient::new(config)?;
    let auth = Authenticator::from_config(client.clone(), config);
    let retry = RetryPolicy::from_millis(config.catalog_max_attempts, &config.catalog_backoff_ms);
    let mut fetcher = DatasetFetcher::connect(client, auth, retry, config.catalog_lang).await?;
    fetcher.fetch_all(config.wholesale_enabled).await
}

/// Authenticates, fetches every dataset, merges them, and writes the CSVs
/// and dashboard. Steps run strictly one after another.
///
/// # Errors
///
/// Any configuration or fetch-stage failure aborts the run with a
/// [`RunError`]. Export and dashboard failures do not; they are logged and
/// reflected in the returned [`RunSummary`].
pub async fn run_pipeline(ctx: &RunContext) -> Result<RunSummary, RunError> {
    run_stages(ctx).instrument(ctx.span()).await
}

async fn run_stages(ctx: &RunContext) -> Result<RunSummary, RunError> {
    tracing::info!(run_id = %ctx.run_id, output = %ctx.paths.root.display(), "run started");

    let config = &ctx.config;
    let datasets = match fetch_datasets(config).await {
        Ok(datasets) => datasets,
        Err(e) => {
            tracing::error!(run_id = %ctx.run_id, error = %e, auth = e.is_auth(), "run aborted");
            return Err(e.into());
        }
    };

    let records = merge(
        &datasets.catalog,
        &datasets.stock,
        &datasets.units_of_measure,
        &datasets.prices,
        datasets.wholesale.as_deref(),
    );

    let exporter = Exporter::new(ctx.paths.csv.clone(), config.export_layout);
    let export = exporter.export_by_manufacturer(&records, &config.manufacturers);

    let dashboard = match render_dashboard(
        &ctx.paths.dashboard,
        &ctx.paths.root,
        &ctx.run_id,
        Local::now(),
        &export.files,
    ) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(run_id = %ctx.run_id, error = %e, "dashboard not written");
            None
        }
    };

    tracing::info!(
        run_id = %ctx.run_id,
        records = records.len(),
        files = export.files.len(),
        skipped = export.failures.len(),
        "run finished"
    );

    Ok(RunSummary {
        run_id: ctx.run_id.clone(),
        records: records.len(),
        export,
        dashboard,
        run_log: ctx.run_log.clone(),
    })
}

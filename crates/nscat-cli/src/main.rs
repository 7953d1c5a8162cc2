use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nscat_core::{AppConfig, ExportLayout};
use nscat_drive::DriveClient;
use nscat_runner::{existing_csvs, init_logging, run_pipeline, upload_outputs, RunContext, UploadReport};
use nscat_supplier::{Authenticator, SupplierClient};

const FALLBACK_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "nscat-cli")]
#[command(about = "Natural Systems catalog export runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, merge and export one catalog snapshot.
    Run {
        /// Upload the generated CSVs to the configured Drive folder.
        #[arg(long)]
        upload: bool,
        /// Column set of the CSVs (`brand` or `full`); overrides `NSCAT_EXPORT_LAYOUT`.
        #[arg(long)]
        layout: Option<ExportLayout>,
    },
    /// Upload CSVs produced by an earlier run.
    Upload {
        /// Directory holding the `brand_*.csv` files; defaults to the CSV output directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show when the supplier token expires.
    Token {
        /// Log in again even if the cached token is still valid.
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(status) => {
            println!("{status}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", report_failure(&e));
            ExitCode::FAILURE
        }
    }
}

/// Logs `e` and returns its status line. Configuration errors surface
/// before any run installs logging, so stderr logging is installed here
/// when nothing else is.
fn report_failure(e: &anyhow::Error) -> String {
    // Already installed when a run got far enough to open its log files.
    init_logging(FALLBACK_FILTER, None, None).ok();
    tracing::error!(error = %format!("{e:#}"), "command failed");
    format!("FAIL: {e:#}")
}

async fn execute(cli: Cli) -> anyhow::Result<String> {
    let mut config = nscat_core::load_app_config_from_env()?;

    match cli.command {
        Commands::Run { upload, layout } => {
            if let Some(layout) = layout {
                config.export_layout = layout;
            }
            let folder = if upload {
                Some(config.require_drive_folder_id()?.to_owned())
            } else {
                None
            };
            let ctx = start_run(config);
            let summary = run_pipeline(&ctx).await?;

            let mut status = summary.status_line();
            if let Some(folder) = folder {
                let store = DriveClient::from_config(&ctx.config)?;
                let report = upload_outputs(&store, &summary.export.paths(), &folder).await;
                status.push_str(&upload_suffix(&report));
                ensure_uploaded(&report)?;
            }
            Ok(status)
        }
        Commands::Upload { dir } => {
            let folder = config.require_drive_folder_id()?.to_owned();
            let ctx = start_run(config);
            let dir = dir.unwrap_or_else(|| ctx.paths.csv.clone());
            let files = existing_csvs(&dir).with_context(|| format!("listing {}", dir.display()))?;
            if files.is_empty() {
                anyhow::bail!("no brand_*.csv files in {}", dir.display());
            }

            let store = DriveClient::from_config(&ctx.config)?;
            let report = upload_outputs(&store, &files, &folder).await;
            let status = format!("OK{}", upload_suffix(&report));
            ensure_uploaded(&report)?;
            Ok(status)
        }
        Commands::Token { refresh } => {
            init_logging(&config.log_level, None, None)?;
            let client = SupplierClient::new(&config)?;
            let auth = Authenticator::from_config(client, &config);
            let token = if refresh {
                auth.refresh_token().await?
            } else {
                auth.get_token().await?
            };
            Ok(format!("OK token valid until {}", token.expires_at().to_rfc3339()))
        }
    }
}

/// Builds the run context and installs logging to its run log and the
/// shared app log, falling back to stderr alone when the files cannot be
/// opened.
fn start_run(config: AppConfig) -> RunContext {
    let ctx = RunContext::new(Arc::new(config));
    let app_log = ctx.paths.app_log();
    if let Err(e) = init_logging(&ctx.config.log_level, Some(&ctx.run_log), Some(&app_log)) {
        if init_logging(&ctx.config.log_level, None, None).is_ok() {
            tracing::warn!(error = %e, "file logging unavailable");
        }
    }
    ctx
}

fn upload_suffix(report: &UploadReport) -> String {
    format!(
        "; uploaded {}/{}",
        report.uploaded.len(),
        report.uploaded.len() + report.failed.len()
    )
}

fn ensure_uploaded(report: &UploadReport) -> anyhow::Result<()> {
    if let Some(first) = report.failed.first() {
        anyhow::bail!(
            "{} of {} uploads failed; first: {}: {}",
            report.failed.len(),
            report.uploaded.len() + report.failed.len(),
            first.file,
            first.error
        );
    }
    Ok(())
}

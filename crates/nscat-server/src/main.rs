mod api;
mod middleware;

use std::sync::Arc;

use nscat_runner::{init_service_logging, OutputPaths, RunLogSink};

use crate::{
    api::{build_app, AppState},
    middleware::RunKey,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(nscat_core::load_app_config()?);
    let paths = OutputPaths::resolve(&config.output_dir);
    let run_logs = RunLogSink::default();
    init_service_logging(&config.log_level, &paths.app_log(), run_logs.clone())?;

    let key = RunKey::new(config.require_run_secret()?);
    if config.drive_folder_id.is_none() {
        tracing::warn!("DRIVE_FOLDER_ID not set; /upload will fail");
    }
    let app = build_app(AppState::new(Arc::clone(&config), paths, key).with_run_logs(run_logs));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

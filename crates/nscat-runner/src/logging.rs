//! Process-wide `tracing` subscriber: stderr plus optional log files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::filter::dynamic_filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Name of the span that [`crate::run_pipeline`] and uploads run inside.
pub const RUN_SPAN: &str = "run";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("cannot open log file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed")]
    AlreadyInstalled,
}

fn open_append(path: &Path) -> Result<File, LoggingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })
}

fn env_filter(fallback_filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter))
        .map_err(|e| LoggingError::Filter {
            filter: fallback_filter.to_owned(),
            reason: e.to_string(),
        })
}

/// Installs the global subscriber. The filter comes from `RUST_LOG`, else
/// `fallback_filter`. `run_log` and `app_log` each get a plain-text layer
/// when given.
///
/// # Errors
///
/// - [`LoggingError::Filter`] if `fallback_filter` does not parse.
/// - [`LoggingError::File`] if a log file cannot be opened.
/// - [`LoggingError::AlreadyInstalled`] on a second call.
pub fn init_logging(
    fallback_filter: &str,
    run_log: Option<&Path>,
    app_log: Option<&Path>,
) -> Result<(), LoggingError> {
    let filter = env_filter(fallback_filter)?;

    let run_layer = run_log
        .map(open_append)
        .transpose()?
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));
    let app_layer = app_log
        .map(open_append)
        .transpose()?
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(run_layer)
        .with(app_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

/// Like [`init_logging`] for a long-lived process: instead of one run log
/// for the whole process, `run_logs` receives the events of whichever run
/// it is attached to.
///
/// # Errors
///
/// Same as [`init_logging`].
pub fn init_service_logging(
    fallback_filter: &str,
    app_log: &Path,
    run_logs: RunLogSink,
) -> Result<(), LoggingError> {
    let filter = env_filter(fallback_filter)?;
    let app_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(open_append(app_log)?));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(app_layer)
        .with(run_log_layer(run_logs))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

/// Plain-text layer writing to `sink`, limited to [`RUN_SPAN`] spans and
/// the events recorded inside them.
#[must_use]
pub fn run_log_layer<S>(sink: RunLogSink) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(sink)
        .with_filter(dynamic_filter_fn(|meta, cx| {
            (meta.is_span() && meta.name() == RUN_SPAN)
                || cx
                    .lookup_current()
                    .is_some_and(|span| span.scope().any(|s| s.name() == RUN_SPAN))
        }))
}

/// File target that runs attach to one at a time. Writes are discarded
/// while nothing is attached.
#[derive(Debug, Clone, Default)]
pub struct RunLogSink {
    file: Arc<Mutex<Option<File>>>,
}

impl RunLogSink {
    /// Points the sink at `path` (appending) until the guard is dropped.
    ///
    /// # Errors
    ///
    /// [`LoggingError::File`] if the file cannot be opened.
    pub fn attach(&self, path: &Path) -> Result<RunLogGuard, LoggingError> {
        let file = open_append(path)?;
        *self.file.lock().unwrap_or_else(PoisonError::into_inner) = Some(file);
        Ok(RunLogGuard { sink: self.clone() })
    }
}

/// Detaches the run log when dropped.
#[derive(Debug)]
pub struct RunLogGuard {
    sink: RunLogSink,
}

impl Drop for RunLogGuard {
    fn drop(&mut self) {
        *self.sink.file.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

pub struct RunLogWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.file.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.file.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RunLogSink {
    type Writer = RunLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RunLogWriter {
            file: Arc::clone(&self.file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");
        open_append(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn run_log_sink_keeps_only_events_of_the_attached_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run-1.log");
        let sink = RunLogSink::default();
        let subscriber = tracing_subscriber::registry().with(run_log_layer(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!(RUN_SPAN, run_id = 0).in_scope(|| tracing::info!("before attach"));
            let guard = sink.attach(&path).unwrap();
            tracing::info!("outside any run");
            tracing::info_span!(RUN_SPAN, run_id = 1).in_scope(|| tracing::info!("fetching datasets"));
            drop(guard);
            tracing::info_span!(RUN_SPAN, run_id = 2).in_scope(|| tracing::info!("after detach"));
        });

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("fetching datasets"), "log: {log}");
        assert!(log.contains("run_id=1"), "log: {log}");
        assert!(!log.contains("before attach"));
        assert!(!log.contains("outside any run"));
        assert!(!log.contains("after detach"));
    }

    #[test]
    fn unopenable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_append(dir.path()).unwrap_err();
        assert!(matches!(err, LoggingError::File { .. }));
    }
}

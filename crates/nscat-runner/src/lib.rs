//! One catalog run: fetch, merge, export, and optionally upload.
//!
//! Both entry points build a [`RunContext`] once per invocation and hand it
//! by reference to [`run_pipeline`].

pub mod context;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod upload;

pub use context::{OutputPaths, RunContext};
pub use error::RunError;
pub use logging::{init_logging, init_service_logging, LoggingError, RunLogGuard, RunLogSink, RUN_SPAN};
pub use pipeline::{run_pipeline, RunSummary};
pub use upload::{existing_csvs, upload_outputs, FailedUpload, UploadReport, UploadedFile};

//! Per-manufacturer CSV files and the HTML dashboard listing them.

pub mod dashboard;
pub mod dirs;
pub mod error;
pub mod layout;
pub mod writer;

pub use dashboard::{render_dashboard, DashboardEntry};
pub use dirs::resolve_dir;
pub use error::ExportError;
pub use layout::{cell_text, header, row};
pub use writer::{brand_file_name, ExportFailure, ExportReport, ExportedFile, Exporter};

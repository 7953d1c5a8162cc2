//! Uploads generated CSV files to a Google Drive folder with a service
//! account.

pub mod client;
pub mod credentials;
pub mod error;
pub mod store;

pub use client::DriveClient;
pub use credentials::{ServiceAccountKey, UploadDiagnostics};
pub use error::UploadError;
pub use store::{FileStore, RemoteFileId};

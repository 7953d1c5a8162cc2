use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::UploadError;

/// Identifier the remote store assigned to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteFileId(pub String);

impl fmt::Display for RemoteFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination for generated files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Uploads `local` into `folder_id` under its file name.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`] when the file cannot be read, the store
    /// refuses the credentials, or the upload is rejected.
    async fn upload_file(&self, local: &Path, folder_id: &str) -> Result<RemoteFileId, UploadError>;
}

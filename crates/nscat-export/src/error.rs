use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write dashboard {}: {source}", path.display())]
    Dashboard {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dashboard template failed to render: {0}")]
    Render(#[from] askama::Error),
}

use std::path::{Path, PathBuf};

/// Creates `preferred` and returns it, or falls back to
/// `<tmp>/<fallback_name>` when `preferred` cannot be created or written.
///
/// The fallback is created too; if that also fails the fallback path is
/// still returned and the caller's own write will surface the error.
#[must_use]
pub fn resolve_dir(preferred: &Path, fallback_name: &str) -> PathBuf {
    match ensure_writable(preferred) {
        Ok(()) => preferred.to_path_buf(),
        Err(e) => {
            let fallback = std::env::temp_dir().join(fallback_name);
            tracing::warn!(
                preferred = %preferred.display(),
                fallback = %fallback.display(),
                error = %e,
                "directory not writable, using fallback"
            );
            if let Err(e) = std::fs::create_dir_all(&fallback) {
                tracing::error!(path = %fallback.display(), error = %e, "fallback directory unavailable");
            }
            fallback
        }
    }
}

fn ensure_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    if std::fs::metadata(dir)?.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "directory is read-only",
        ));
    }
    Ok(())
}

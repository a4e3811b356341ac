//! File operation utilities

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::error::{DownloadError, FileOperation, Result};

/// Check that the output directory was chosen and exists
pub async fn ensure_output_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Err(DownloadError::OutputDirectoryUnset);
    }

    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DownloadError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DownloadError::OutputDirectoryMissing {
                path: dir.to_path_buf(),
            })
        }
        Err(e) => Err(DownloadError::FileSystem {
            path: dir.to_path_buf(),
            operation: FileOperation::Metadata,
            source: e,
        }),
    }
}

/// Whether something already occupies `path`
pub async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Create a temporary file path for an in-flight download
///
/// Appends `.part` to the full file name so `a.jpg` and `a.png` never share a
/// temporary file.
pub fn create_temp_path(dest_path: &Path) -> PathBuf {
    let mut name: OsString = dest_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest_path.with_file_name(name)
}

/// Atomically rename a temporary file to its final destination
pub async fn atomic_rename(temp_path: &Path, dest_path: &Path) -> Result<()> {
    fs::rename(temp_path, dest_path)
        .await
        .map_err(|e| DownloadError::FileSystem {
            path: dest_path.to_path_buf(),
            operation: FileOperation::Move,
            source: e,
        })?;
    debug!("Atomically renamed {} to {}", temp_path.display(), dest_path.display());
    Ok(())
}

/// Best-effort removal of a partial download
pub async fn remove_partial(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove partial file {}: {}", temp_path.display(), e);
        }
    }
}

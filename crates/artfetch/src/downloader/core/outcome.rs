//! Per-item download outcomes and their log lines

use std::path::PathBuf;

/// Why an item was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Target existed and skip-existing was active
    ExistingFile,
    /// Target existed and the user declined to rename
    RenameDeclined,
}

/// Result of one attempted asset
///
/// Exactly one outcome is produced per URL. Its `Display` form is the log line
/// for that item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved {
        file: String,
        path: PathBuf,
        size_bytes: u64,
    },
    /// Saved, but the declared `Content-Length` disagreed with the bytes written
    SavedWithWarning {
        file: String,
        path: PathBuf,
        size_bytes: u64,
        size_mismatch: u64,
    },
    SavedRenamed {
        original_name: String,
        new_name: String,
        path: PathBuf,
        size_bytes: u64,
    },
    Skipped {
        file: String,
        reason: SkipReason,
    },
    RateLimited {
        url: String,
    },
    Error {
        url: String,
        message: String,
    },
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::Saved { .. }
                | DownloadOutcome::SavedWithWarning { .. }
                | DownloadOutcome::SavedRenamed { .. }
        )
    }

    /// Where the file ended up, for saved outcomes
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DownloadOutcome::Saved { path, .. }
            | DownloadOutcome::SavedWithWarning { path, .. }
            | DownloadOutcome::SavedRenamed { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadOutcome::Saved {
                file, size_bytes, ..
            } => write!(f, "+ Saved: \"{}\" with {}", file, format_size(*size_bytes)),
            DownloadOutcome::SavedWithWarning {
                file,
                size_bytes,
                size_mismatch,
                ..
            } => write!(
                f,
                "* Saved: \"{}\" with {} - Warning: File size mismatch between local copy and server by {}",
                file,
                format_size(*size_bytes),
                format_size(*size_mismatch)
            ),
            DownloadOutcome::SavedRenamed {
                original_name,
                new_name,
                size_bytes,
                ..
            } => write!(
                f,
                "+ Saved \"{}\" as: \"{}\" with {}",
                original_name,
                new_name,
                format_size(*size_bytes)
            ),
            DownloadOutcome::Skipped { file, .. } => {
                write!(f, "^ Skipped \"{}\" as it already exists", file)
            }
            DownloadOutcome::RateLimited { url } => {
                write!(f, "! 429 Too Many Requests while downloading \"{}\"", url)
            }
            DownloadOutcome::Error { message, .. } => write!(f, "! {}", message),
        }
    }
}

/// Difference between declared and written length, if it matters
///
/// A missing or zero `Content-Length` never counts as a mismatch.
pub fn size_mismatch(declared: Option<u64>, written: u64) -> Option<u64> {
    match declared {
        Some(declared) if declared != 0 && declared != written => Some(declared.abs_diff(written)),
        _ => None,
    }
}

/// Human-readable byte count using decimal units (`950 B`, `1.2 MB`)
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["kB", "MB", "GB", "TB", "PB"];

    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

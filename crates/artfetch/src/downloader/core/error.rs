//! Error types for the downloader with context for logging and run control

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the downloader
///
/// Everything except the output-directory checks is caught at the item
/// boundary and turned into a [`DownloadOutcome`](super::DownloadOutcome).
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Server answered with a non-2xx status
    #[error("HTTP error while downloading '{url}': {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Network timeout
    #[error("Request to '{url}' timed out after {duration_secs}s")]
    NetworkTimeout { url: String, duration_secs: u64 },

    /// Any other transport-level failure
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("No output directory selected")]
    OutputDirectoryUnset,

    #[error("Output directory '{path}' does not exist")]
    OutputDirectoryMissing { path: PathBuf },

    #[error("Output path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },
}

/// Types of file operations for error context
#[derive(Debug, Clone, PartialEq)]
pub enum FileOperation {
    Create,
    Write,
    Move,
    Metadata,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata"),
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Wrap a reqwest error, keeping timeouts apart from other failures
    pub fn from_reqwest(url: &str, error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            DownloadError::NetworkTimeout {
                url: url.to_string(),
                duration_secs: timeout.as_secs(),
            }
        } else if let Some(status) = error.status() {
            DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            }
        } else {
            DownloadError::HttpRequest {
                url: url.to_string(),
                source: error,
            }
        }
    }

    /// HTTP 429 from the origin
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DownloadError::HttpStatus { status, .. } if *status == reqwest::StatusCode::TOO_MANY_REQUESTS)
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::HttpStatus { .. } if self.is_rate_limited() => "rate_limited",
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::NetworkTimeout { .. } => "network_timeout",
            DownloadError::HttpRequest { .. } => "http_request",
            DownloadError::FileSystem { .. } => "file_system",
            DownloadError::OutputDirectoryUnset
            | DownloadError::OutputDirectoryMissing { .. }
            | DownloadError::NotADirectory { .. } => "output_directory",
            DownloadError::Configuration { .. } => "configuration",
        }
    }

    /// Message for the per-item log line, without the leading marker
    pub fn log_message(&self) -> String {
        match self {
            DownloadError::HttpStatus { url, status } => {
                format!("HTTP error while downloading \"{}\": {}", url, status)
            }
            DownloadError::NetworkTimeout { url, .. } => {
                format!("Timeout reached while fetching \"{}\"", url)
            }
            DownloadError::HttpRequest { url, source } => {
                format!("Failed \"{}\": {}", url, error_chain(source))
            }
            DownloadError::FileSystem {
                path,
                operation,
                source,
            } => format!("Failed {} \"{}\": {}", operation, path.display(), source),
            other => other.to_string(),
        }
    }
}

/// Flatten an error and its sources into one line
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}

//! Core types used throughout the downloader system
//!
//! This module contains the fundamental types that all other modules depend on.
//! By organizing these in a core module, we make the dependency relationships clear.

pub mod error;
pub mod files;
pub mod http;
pub mod naming;
pub mod outcome;
pub mod progress;
pub mod summary;

// Re-export main types for convenience
pub use error::{DownloadError, FileOperation, Result};
pub use outcome::{DownloadOutcome, SkipReason, format_size, size_mismatch};
pub use progress::{
    ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressEvent, ProgressReporter,
};
pub use summary::RunSummary;

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Requested image resolution class
///
/// Selected through the path segment that the CDN uses in place of `large`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageQuality {
    Small,
    Medium,
    Large,
    FourK,
    #[default]
    EightK,
}

impl ImageQuality {
    pub const ALL: [ImageQuality; 5] = [
        ImageQuality::Small,
        ImageQuality::Medium,
        ImageQuality::Large,
        ImageQuality::FourK,
        ImageQuality::EightK,
    ];

    /// Path segment for this tier
    pub fn as_str(self) -> &'static str {
        match self {
            ImageQuality::Small => "small",
            ImageQuality::Medium => "medium",
            ImageQuality::Large => "large",
            ImageQuality::FourK => "4k",
            ImageQuality::EightK => "8k",
        }
    }
}

impl std::fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown image quality '{0}' (expected one of: small, medium, large, 4k, 8k)")]
pub struct ParseQualityError(pub String);

impl FromStr for ImageQuality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ImageQuality::ALL
            .into_iter()
            .find(|quality| quality.as_str() == wanted)
            .ok_or_else(|| ParseQualityError(s.to_string()))
    }
}

/// How output file names are chosen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// URL basename without query string and extension
    #[default]
    DeriveFromUrl,
    /// `<prefix>1`, `<prefix>2`, ... in processing order
    SequentialCustom { prefix: String },
}

impl NamingPolicy {
    /// Sequential naming for a non-empty prefix, URL naming otherwise
    pub fn from_prefix(prefix: Option<String>) -> Self {
        match prefix {
            Some(prefix) if !prefix.is_empty() => NamingPolicy::SequentialCustom { prefix },
            _ => NamingPolicy::DeriveFromUrl,
        }
    }

    /// File name stem for the item at 1-based `position` of the run
    pub fn base_name(&self, url: &str, position: usize) -> String {
        match self {
            NamingPolicy::DeriveFromUrl => naming::derive_base_name(url),
            NamingPolicy::SequentialCustom { prefix } => format!("{}{}", prefix, position),
        }
    }
}

/// Everything one run needs besides the user-facing callbacks
#[derive(Debug, Clone)]
pub struct FetchJob {
    /// Asset URLs in processing order, exclusions already applied
    pub urls: Vec<String>,
    pub out_dir: PathBuf,
    pub quality: ImageQuality,
    pub skip_existing: bool,
    pub naming: NamingPolicy,
}

impl FetchJob {
    /// Job with the default tier (8k), skip-existing on and URL-derived names
    pub fn new<P: Into<PathBuf>>(urls: Vec<String>, out_dir: P) -> Self {
        Self {
            urls,
            out_dir: out_dir.into(),
            quality: ImageQuality::default(),
            skip_existing: true,
            naming: NamingPolicy::default(),
        }
    }

    pub fn with_quality(mut self, quality: ImageQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }
}

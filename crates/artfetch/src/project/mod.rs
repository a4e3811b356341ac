//! Project metadata loading
//!
//! This module turns an ArtStation project description (the JSON served at
//! `/projects/<hash_id>.json`) into the ordered list of image assets the
//! downloader works through. Covers, videos and other asset kinds are
//! dropped while the list is built, since they cannot be fetched through the
//! image endpoints.

pub mod client;
pub mod parser;

pub use client::{DEFAULT_PROJECT_BASE_URL, ProjectClient, project_json_url};
pub use parser::{extract_hash_id, parse_project};

use std::collections::HashSet;
use thiserror::Error;

/// Kind of an asset entry in the project JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    Image,
    Cover,
    Video,
    Other,
}

impl AssetType {
    pub fn is_image(self) -> bool {
        matches!(self, AssetType::Image)
    }
}

impl From<&str> for AssetType {
    fn from(value: &str) -> Self {
        match value {
            "image" => AssetType::Image,
            "cover" => AssetType::Cover,
            "video" | "video_clip" => AssetType::Video,
            _ => AssetType::Other,
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Image => write!(f, "image"),
            AssetType::Cover => write!(f, "cover"),
            AssetType::Video => write!(f, "video"),
            AssetType::Other => write!(f, "other"),
        }
    }
}

/// One downloadable asset of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub url: String,
    pub asset_type: AssetType,
}

impl AssetRecord {
    pub fn new<S: Into<String>>(url: S, asset_type: AssetType) -> Self {
        Self {
            url: url.into(),
            asset_type,
        }
    }
}

/// Parsed project metadata
///
/// `assets` only ever contains image records, in the order the project JSON
/// lists them. An empty list is a valid project ("no images found"), not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectData {
    pub hash_id: String,
    pub assets: Vec<AssetRecord>,
}

impl ProjectData {
    /// Image URLs in project order
    pub fn image_urls(&self) -> Vec<String> {
        self.assets.iter().map(|asset| asset.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Image URLs with the given zero-based indices left out
    ///
    /// Relative order of the remaining URLs is preserved. Indices past the end
    /// of the list are ignored.
    pub fn selected_urls(&self, excluded: &[usize]) -> Vec<String> {
        let excluded: HashSet<usize> = excluded.iter().copied().collect();
        self.assets
            .iter()
            .enumerate()
            .filter(|(index, _)| !excluded.contains(index))
            .map(|(_, asset)| asset.url.clone())
            .collect()
    }
}

/// Errors raised while obtaining or parsing project metadata
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The text is not JSON at all
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON parsed but lacks a required key
    #[error("Malformed project data: missing or invalid '{field}'")]
    MissingField { field: String },

    #[error("No project hash ID given")]
    EmptyHashId,

    #[error("Invalid project URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Project request to '{url}' returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Project request to '{url}' failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProjectError {
    pub(crate) fn missing<S: Into<String>>(field: S) -> Self {
        ProjectError::MissingField {
            field: field.into(),
        }
    }

    /// True when the JSON was well-formed but not shaped like a project
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProjectError::MissingField { .. })
    }
}

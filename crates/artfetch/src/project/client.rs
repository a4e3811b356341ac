//! Remote project metadata client

use reqwest::Client;
use tracing::debug;

use super::{ProjectData, ProjectError, parse_project};
use crate::downloader::DownloadConfig;
use crate::downloader::core::http::build_client;

pub const DEFAULT_PROJECT_BASE_URL: &str = "https://www.artstation.com/projects/";

/// URL of the JSON document describing a project
///
/// Users whose requests get blocked can open this in a browser and feed the
/// saved JSON back through [`parse_project`].
pub fn project_json_url(base_url: &str, hash_id: &str) -> Result<String, ProjectError> {
    let hash_id = hash_id.trim();
    if hash_id.is_empty() {
        return Err(ProjectError::EmptyHashId);
    }

    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    let parsed = url::Url::parse(&base).map_err(|e| ProjectError::InvalidUrl {
        url: base.clone(),
        source: e,
    })?;
    let joined = parsed
        .join(&format!("{}.json", hash_id))
        .map_err(|e| ProjectError::InvalidUrl {
            url: format!("{}{}.json", base, hash_id),
            source: e,
        })?;

    Ok(joined.to_string())
}

/// Fetches project metadata over HTTP
pub struct ProjectClient {
    client: Client,
    base_url: String,
}

impl ProjectClient {
    pub fn new(config: &DownloadConfig) -> crate::downloader::Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.project_base_url.clone(),
        })
    }

    pub fn json_url(&self, hash_id: &str) -> Result<String, ProjectError> {
        project_json_url(&self.base_url, hash_id)
    }

    /// Download and parse the project identified by `hash_id`
    pub async fn fetch_project(&self, hash_id: &str) -> Result<ProjectData, ProjectError> {
        let url = self.json_url(hash_id)?;
        debug!("Fetching project metadata: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProjectError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProjectError::Status { url, status });
        }

        let body = response.text().await.map_err(|e| ProjectError::Request {
            url: url.clone(),
            source: e,
        })?;

        parse_project(&body)
    }
}

//! Configuration types for the downloader system

use std::time::Duration;

use crate::downloader::core::{DownloadError, Result};
use crate::project::DEFAULT_PROJECT_BASE_URL;

/// Browser user agent; the image CDN rejects obvious non-browser clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

pub const DEFAULT_CACHE_CONTROL: &str = "max-age=0, no-cache, no-store, must-revalidate";

/// Configuration for download operations
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Per-request timeout, shared by metadata and asset requests
    pub timeout: Duration,
    pub user_agent: String,
    /// Value of the `Cache-Control` request header
    pub cache_control: String,
    /// Largest slice written to disk in one call
    pub chunk_size: usize,
    /// Base of the project metadata endpoint (`<base><hash_id>.json`)
    pub project_base_url: String,
    /// Append the random cache-defeat token to asset URLs
    pub cache_defeat: bool,
}

impl DownloadConfig {
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder::default()
    }

    /// Defaults overridden by `ARTFETCH_*` variables from the environment or a `.env` file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("ARTFETCH_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| DownloadError::Configuration {
                message: format!("'{}' is not a number of seconds", raw),
                field: Some("ARTFETCH_TIMEOUT_SECS".to_string()),
            })?;
            if secs == 0 {
                return Err(DownloadError::Configuration {
                    message: "timeout must be at least one second".to_string(),
                    field: Some("ARTFETCH_TIMEOUT_SECS".to_string()),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(user_agent) = lookup("ARTFETCH_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.user_agent = user_agent;
        }

        if let Some(base) = lookup("ARTFETCH_PROJECT_BASE_URL").filter(|v| !v.trim().is_empty()) {
            url::Url::parse(&base).map_err(|e| DownloadError::Configuration {
                message: format!("'{}' is not a valid URL: {}", base, e),
                field: Some("ARTFETCH_PROJECT_BASE_URL".to_string()),
            })?;
            config.project_base_url = base;
        }

        Ok(config)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            chunk_size: 8192,
            project_base_url: DEFAULT_PROJECT_BASE_URL.to_string(),
            cache_defeat: true,
        }
    }
}

/// Builder for [`DownloadConfig`]
#[derive(Debug, Clone, Default)]
pub struct DownloadConfigBuilder {
    config: DownloadConfig,
}

impl DownloadConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn cache_control<S: Into<String>>(mut self, cache_control: S) -> Self {
        self.config.cache_control = cache_control.into();
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size.max(1);
        self
    }

    pub fn project_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.config.project_base_url = base_url.into();
        self
    }

    pub fn cache_defeat(mut self, enabled: bool) -> Self {
        self.config.cache_defeat = enabled;
        self
    }

    pub fn build(self) -> DownloadConfig {
        self.config
    }
}

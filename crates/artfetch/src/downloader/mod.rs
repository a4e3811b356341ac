//! Downloader module
//!
//! This module contains the asset fetcher: configuration, core types,
//! collision handling and the sequential run loop.
//!
//! The call chain flows as follows:
//!
//! User Code
//! ↓
//! Fetcher (this file)
//! ↓
//! batch::fetch_all (batch/mod.rs)
//! ↓
//! collision::resolve_collision (collision.rs)
//! ↓
//! Core types (core/*)

pub mod batch;
pub mod collision;
pub mod config;
pub mod core;

// Re-export main types for convenience
pub use collision::{RenameDecision, RenamePrompt, RunContext, SkipPrompt};
pub use config::{DownloadConfig, DownloadConfigBuilder};
pub use self::core::{
    ConsoleProgressReporter, DownloadError, DownloadOutcome, FetchJob, FileOperation,
    ImageQuality, IntoProgressCallback, NamingPolicy, NullProgressReporter, ParseQualityError,
    ProgressCallback, ProgressEvent, ProgressReporter, Result, RunSummary, SkipReason,
    format_size,
};

use self::core::http::HttpClient;

/// Sequential asset downloader
///
/// Holds one HTTP client (and with it one cookie session) that is reused for
/// every item of every run started from this fetcher.
pub struct Fetcher {
    client: HttpClient,
    config: DownloadConfig,
}

impl Fetcher {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = HttpClient::from_config(&config)?;
        Ok(Self { client, config })
    }

    /// Download every URL of `job` one after another
    ///
    /// `prompt` is only consulted for collisions while skip-existing is off.
    /// The returned summary has `rate_limited` set when an HTTP 429 halted
    /// the run before all items were attempted.
    pub async fn fetch_all(
        &self,
        job: FetchJob,
        prompt: &mut dyn RenamePrompt,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<RunSummary> {
        batch::fetch_all(&self.client, &self.config, job, prompt, progress_callback).await
    }
}

#[cfg(test)]
mod tests;

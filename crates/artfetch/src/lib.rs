//! Artfetch Library
//!
//! This library loads public ArtStation project metadata and downloads the
//! image assets it lists into a local directory. Downloads run strictly one
//! at a time, resolve filename collisions without overwriting anything, and
//! report one log line per asset plus a run summary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use artfetch::{
//!     DownloadConfig, FetchJob, Fetcher, ImageQuality, NamingPolicy,
//!     ProgressEvent, ProjectClient, SkipPrompt,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloadConfig::default();
//!
//! // Load the project metadata and keep the image assets
//! let client = ProjectClient::new(&config)?;
//! let project = client.fetch_project("AbC123").await?;
//!
//! let job = FetchJob::new(project.image_urls(), "/path/to/artworks")
//!     .with_quality(ImageQuality::FourK)
//!     .with_naming(NamingPolicy::from_prefix(Some("sketch_".to_string())));
//!
//! let progress_callback = Arc::new(|event: ProgressEvent| match event {
//!     ProgressEvent::Log { line } => println!("{}", line),
//!     ProgressEvent::RunFinished { summary } => println!("{}", summary.summary_line()),
//!     _ => {}
//! });
//!
//! let fetcher = Fetcher::new(config)?;
//! let summary = fetcher
//!     .fetch_all(job, &mut SkipPrompt, Some(progress_callback))
//!     .await?;
//! if summary.rate_limited {
//!     println!("Rate limit exceeded");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Project loading**: from the remote JSON endpoint or from raw JSON text
//! - **Quality tiers**: `small` through `8k` via the asset URL path
//! - **Cache-defeat**: every request carries an unpredictable query token
//! - **Collision handling**: skip, rename interactively, or skip all
//! - **Size checks**: declared vs. written length mismatches become warnings
//! - **Rate limits**: an HTTP 429 halts the remaining run

pub mod downloader;
pub mod project;

// Re-export commonly used types for convenience
pub use downloader::{
    DownloadConfig, DownloadConfigBuilder, DownloadError, DownloadOutcome, FetchJob, Fetcher,
    ImageQuality, IntoProgressCallback, NamingPolicy, ProgressCallback, ProgressEvent,
    ProgressReporter, RenameDecision, RenamePrompt, Result, RunSummary, SkipPrompt, format_size,
};
pub use project::{
    AssetRecord, AssetType, ProjectClient, ProjectData, ProjectError, extract_hash_id,
    parse_project, project_json_url,
};

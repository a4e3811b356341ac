//! Sequential run over a job's URLs
//!
//! One request is in flight at a time and each item is written to disk
//! before the next request starts. Per-item failures become outcomes; only a
//! rate-limit response stops the loop early.

use tracing::{debug, info, warn};

use crate::downloader::collision::{CollisionResolution, RenamePrompt, RunContext, resolve_collision};
use crate::downloader::config::DownloadConfig;
use crate::downloader::core::{
    DownloadError, DownloadOutcome, FetchJob, NamingPolicy, ProgressCallback, ProgressEvent,
    Result, RunSummary, SkipReason,
    files::ensure_output_dir,
    http::HttpClient,
    naming::{apply_quality, no_cache_url, resolve_extension},
    size_mismatch,
};

/// Process every URL of `job` in order
///
/// Fails only when the output directory is unusable, before anything is
/// requested.
pub async fn fetch_all(
    client: &HttpClient,
    config: &DownloadConfig,
    job: FetchJob,
    prompt: &mut dyn RenamePrompt,
    progress_callback: Option<ProgressCallback>,
) -> Result<RunSummary> {
    ensure_output_dir(&job.out_dir).await?;

    let total = job.urls.len();
    let mut summary = RunSummary::new(total);
    let mut context = RunContext::new(job.skip_existing);

    info!(
        "Downloading {} images at {} into {} ({})",
        total,
        job.quality,
        job.out_dir.display(),
        describe_naming(&job.naming)
    );
    emit(&progress_callback, ProgressEvent::RunStarted { total });

    for (index, url) in job.urls.iter().enumerate() {
        let position = index + 1;
        let outcome = fetch_one(client, config, &job, url, position, &mut context, prompt).await;
        summary.record(&outcome);

        emit(
            &progress_callback,
            ProgressEvent::Log {
                line: outcome.to_string(),
            },
        );

        if let DownloadOutcome::RateLimited { url } = &outcome {
            warn!("Rate limited at item {}/{}; halting run", position, total);
            emit(&progress_callback, ProgressEvent::RateLimited { url: url.clone() });
            break;
        }

        emit(
            &progress_callback,
            ProgressEvent::Progress {
                completed: position,
                total,
            },
        );
    }

    info!("{}", summary.summary_line());
    emit(
        &progress_callback,
        ProgressEvent::RunFinished {
            summary: summary.clone(),
        },
    );

    Ok(summary)
}

/// Download one asset and classify the result
///
/// Never fails: every error is folded into the returned outcome.
pub async fn fetch_one(
    client: &HttpClient,
    config: &DownloadConfig,
    job: &FetchJob,
    url: &str,
    position: usize,
    context: &mut RunContext,
    prompt: &mut dyn RenamePrompt,
) -> DownloadOutcome {
    let base_name = job.naming.base_name(url, position);
    let quality_url = apply_quality(url, job.quality);

    match try_fetch_one(client, config, job, &quality_url, &base_name, context, prompt).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_rate_limited() => DownloadOutcome::RateLimited { url: quality_url },
        Err(e) => {
            debug!("Item {} failed ({}): {}", position, e.category(), e);
            DownloadOutcome::Error {
                url: quality_url,
                message: e.log_message(),
            }
        }
    }
}

async fn try_fetch_one(
    client: &HttpClient,
    config: &DownloadConfig,
    job: &FetchJob,
    url: &str,
    base_name: &str,
    context: &mut RunContext,
    prompt: &mut dyn RenamePrompt,
) -> std::result::Result<DownloadOutcome, DownloadError> {
    let request_url = if config.cache_defeat {
        no_cache_url(url)
    } else {
        url.to_string()
    };

    let asset = client.open(url, &request_url).await?;
    let extension = resolve_extension(asset.content_type.as_deref(), &request_url);
    let file = format!("{}{}", base_name, extension);
    let declared = asset.content_length;

    let (path, renamed_to) =
        match resolve_collision(&job.out_dir, base_name, &extension, context, prompt).await {
            CollisionResolution::Free(path) => (path, None),
            CollisionResolution::Renamed { path, file_name } => (path, Some(file_name)),
            CollisionResolution::Skip { declined } => {
                let reason = if declined {
                    SkipReason::RenameDeclined
                } else {
                    SkipReason::ExistingFile
                };
                return Ok(DownloadOutcome::Skipped { file, reason });
            }
        };

    let size_bytes = client.stream_to_file(asset, &path).await?;

    if let Some(mismatch) = size_mismatch(declared, size_bytes) {
        warn!(
            "Size mismatch for {}: declared {:?}, wrote {} bytes",
            path.display(),
            declared,
            size_bytes
        );
        let saved_as = renamed_to.unwrap_or(file);
        return Ok(DownloadOutcome::SavedWithWarning {
            file: saved_as,
            path,
            size_bytes,
            size_mismatch: mismatch,
        });
    }

    Ok(match renamed_to {
        Some(new_name) => DownloadOutcome::SavedRenamed {
            original_name: file,
            new_name,
            path,
            size_bytes,
        },
        None => DownloadOutcome::Saved {
            file,
            path,
            size_bytes,
        },
    })
}

fn emit(progress_callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = progress_callback {
        callback(event);
    }
}

/// Naming in use for a job, for log context
pub fn describe_naming(naming: &NamingPolicy) -> String {
    match naming {
        NamingPolicy::DeriveFromUrl => "names from URL".to_string(),
        NamingPolicy::SequentialCustom { prefix } => format!("names {}1, {}2, ...", prefix, prefix),
    }
}

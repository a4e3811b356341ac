//! HTTP utilities
//!
//! One configured client shared by the metadata loader and the asset
//! fetcher, plus the streaming write used for every asset.

use futures::StreamExt;
use reqwest::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Response};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::error::{DownloadError, FileOperation, Result};
use super::files::{atomic_rename, create_temp_path, remove_partial};
use crate::downloader::config::DownloadConfig;

/// Build the reqwest client for a configuration
///
/// Cookies persist across requests of the same client, like a browser session.
pub fn build_client(config: &DownloadConfig) -> Result<Client> {
    finish(client_builder(config)?)
}

/// Client builder with headers and timeouts applied
///
/// The timeout bounds connecting and each read, not the whole transfer.
fn client_builder(config: &DownloadConfig) -> Result<ClientBuilder> {
    let mut headers = HeaderMap::new();
    let cache_control =
        HeaderValue::from_str(&config.cache_control).map_err(|e| DownloadError::Configuration {
            message: format!("invalid Cache-Control header value: {}", e),
            field: Some("cache_control".to_string()),
        })?;
    headers.insert(CACHE_CONTROL, cache_control);

    Ok(Client::builder()
        .connect_timeout(config.timeout)
        .read_timeout(config.timeout)
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .cookie_store(true))
}

fn finish(builder: ClientBuilder) -> Result<Client> {
    builder.build().map_err(|e| DownloadError::Configuration {
        message: format!("Failed to create HTTP client: {}", e),
        field: None,
    })
}

/// A successful (2xx) response whose body has not been read yet
pub struct AssetResponse {
    pub url: String,
    pub content_type: Option<String>,
    /// Declared `Content-Length`, if the server sent one
    pub content_length: Option<u64>,
    response: Response,
}

/// HTTP client with integrated download functionality
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    chunk_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client from download configuration
    ///
    /// Assets are requested without transparent decompression so the
    /// declared `Content-Length` describes the bytes that reach the disk.
    pub fn from_config(config: &DownloadConfig) -> Result<Self> {
        let builder = client_builder(config)?.no_gzip().no_brotli();
        Ok(Self {
            client: finish(builder)?,
            timeout: config.timeout,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Send a GET and fail on any non-2xx status
    ///
    /// `request_url` is what goes on the wire; `url` is the address used in
    /// errors and log lines.
    pub async fn open(&self, url: &str, request_url: &str) -> Result<AssetResponse> {
        debug!("GET {}", request_url);
        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        debug!("Content type: {:?}, content length: {:?}", content_type, content_length);

        Ok(AssetResponse {
            url: url.to_string(),
            content_type,
            content_length,
            response,
        })
    }

    /// Stream a response body to `dest_path`, returning the bytes written
    ///
    /// The body goes to a `.part` file first and is renamed into place only
    /// once complete; on failure the partial file is removed. A body that ends
    /// early against a declared length is kept, and the short count returned.
    pub async fn stream_to_file(&self, asset: AssetResponse, dest_path: &Path) -> Result<u64> {
        let temp_path = create_temp_path(dest_path);
        let url = asset.url.clone();

        let written = match self.write_body(asset, &temp_path).await {
            Ok(written) => written,
            Err(e) => {
                remove_partial(&temp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = atomic_rename(&temp_path, dest_path).await {
            remove_partial(&temp_path).await;
            return Err(e);
        }

        debug!("Stream download of {} completed: {} bytes", url, written);
        Ok(written)
    }

    async fn write_body(&self, asset: AssetResponse, temp_path: &Path) -> Result<u64> {
        let mut file = fs::File::create(temp_path)
            .await
            .map_err(|e| DownloadError::FileSystem {
                path: temp_path.to_path_buf(),
                operation: FileOperation::Create,
                source: e,
            })?;

        let declared = asset.content_length;
        let mut stream = asset.response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) if is_truncated_body(&e, declared, written) => {
                    warn!(
                        "Body of {} ended after {} of {:?} bytes: {}",
                        asset.url, written, declared, e
                    );
                    break;
                }
                Err(e) => return Err(DownloadError::from_reqwest(&asset.url, e, self.timeout)),
            };

            // Empty chunks are keep-alive artifacts
            if chunk.is_empty() {
                continue;
            }

            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece)
                    .await
                    .map_err(|e| DownloadError::FileSystem {
                        path: temp_path.to_path_buf(),
                        operation: FileOperation::Write,
                        source: e,
                    })?;
                written += piece.len() as u64;
            }
        }

        file.flush().await.map_err(|e| DownloadError::FileSystem {
            path: temp_path.to_path_buf(),
            operation: FileOperation::Write,
            source: e,
        })?;

        file.sync_all().await.map_err(|e| DownloadError::FileSystem {
            path: temp_path.to_path_buf(),
            operation: FileOperation::Write,
            source: e,
        })?;

        Ok(written)
    }
}

/// A body error after some bytes arrived but before the declared length
fn is_truncated_body(error: &reqwest::Error, declared: Option<u64>, written: u64) -> bool {
    !error.is_timeout() && written > 0 && declared.is_some_and(|declared| written < declared)
}

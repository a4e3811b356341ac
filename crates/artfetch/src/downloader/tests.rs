//! End-to-end tests for the fetcher against mock servers

use super::*;
use crate::project::{AssetRecord, AssetType, ProjectData};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Helper struct to capture progress events during testing
#[derive(Debug, Default)]
struct ProgressCapture {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressCapture {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn get_callback(&self) -> ProgressCallback {
        let events = self.events.clone();
        Arc::new(move |event| {
            events.lock().unwrap().push(event);
        })
    }

    fn get_events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    fn log_lines(&self) -> Vec<String> {
        self.get_events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Log { line } => Some(line),
                _ => None,
            })
            .collect()
    }

    fn progress_updates(&self) -> Vec<(usize, usize)> {
        self.get_events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { completed, total } => Some((completed, total)),
                _ => None,
            })
            .collect()
    }

    fn count_events_of_type(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| match event {
                ProgressEvent::RunStarted { .. } => event_type == "run_started",
                ProgressEvent::Log { .. } => event_type == "log",
                ProgressEvent::Progress { .. } => event_type == "progress",
                ProgressEvent::RateLimited { .. } => event_type == "rate_limited",
                ProgressEvent::RunFinished { .. } => event_type == "run_finished",
            })
            .count()
    }
}

fn test_config() -> DownloadConfig {
    DownloadConfig::builder()
        .timeout(Duration::from_secs(5))
        .build()
}

fn test_fetcher() -> Fetcher {
    Fetcher::new(test_config()).unwrap()
}

/// Asset URL the way project JSON lists it (always the `large` tier)
fn asset_url(server: &MockServer, name: &str) -> String {
    format!("{}/p/assets/images/large/{}?1700000000", server.uri(), name)
}

async fn mount_image(server: &MockServer, tier: &str, name: &str, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/p/assets/images/{}/{}", tier, name)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", content_type)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, tier: &str, name: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/p/assets/images/{}/{}", tier, name)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Response head for a raw socket server
fn raw_head(content_length: usize) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_length
    )
}

/// Answer a single request with `head` followed by `pieces`, pausing after each
///
/// Lets tests send bodies that a well-behaved mock server would not, such as
/// one shorter than its declared length.
async fn serve_raw_once(head: String, pieces: Vec<Vec<u8>>, pause: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        socket.write_all(head.as_bytes()).await.unwrap();
        for piece in pieces {
            socket.write_all(&piece).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(pause).await;
        }
        let _ = socket.shutdown().await;
    });

    format!("http://{}", addr)
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[cfg(test)]
mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_with_quality_and_derived_name() {
        let server = MockServer::start().await;
        mount_image(&server, "4k", "001.jpg", b"jpeg-bytes!", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let job = FetchJob::new(vec![asset_url(&server, "001.jpg")], temp_dir.path())
            .with_quality(ImageQuality::FourK);
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(job, &mut SkipPrompt, Some(progress.get_callback()))
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.saved(), 1);
        assert!(summary.completed());

        let saved = temp_dir.path().join("001.jpg");
        assert_eq!(tokio::fs::read(&saved).await.unwrap(), b"jpeg-bytes!");
        assert!(!temp_dir.path().join("001.jpg.part").exists());

        assert_eq!(progress.log_lines(), vec!["+ Saved: \"001.jpg\" with 11 B".to_string()]);
        assert_eq!(progress.progress_updates(), vec![(1, 1)]);
        assert_eq!(progress.count_events_of_type("run_started"), 1);
        assert_eq!(progress.count_events_of_type("run_finished"), 1);
    }

    #[tokio::test]
    async fn test_request_carries_cache_defeat_token() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "001.jpg", b"data", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let job = FetchJob::new(vec![asset_url(&server, "001.jpg")], temp_dir.path());
        test_fetcher().fetch_all(job, &mut SkipPrompt, None).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let query = requests[0].url.query().unwrap().to_string();
        let (original, token) = query.split_once('&').unwrap();
        assert_eq!(original, "1700000000");
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_content_type_overrides_url_extension() {
        let server = MockServer::start().await;
        mount_image(&server, "large", "002.jpg", b"png-bytes", "image/png").await;

        let temp_dir = tempdir().unwrap();
        let job = FetchJob::new(vec![asset_url(&server, "002.jpg")], temp_dir.path())
            .with_quality(ImageQuality::Large);

        test_fetcher().fetch_all(job, &mut SkipPrompt, None).await.unwrap();

        assert!(temp_dir.path().join("002.png").exists());
        assert!(!temp_dir.path().join("002.jpg").exists());
    }

    #[tokio::test]
    async fn test_exclusions_and_sequential_names_without_gaps() {
        let server = MockServer::start().await;
        for name in ["a.jpg", "c.jpg", "e.jpg"] {
            mount_image(&server, "8k", name, name.as_bytes(), "image/jpeg").await;
        }

        let project = ProjectData {
            hash_id: "AbC123".to_string(),
            assets: ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]
                .iter()
                .map(|name| AssetRecord::new(asset_url(&server, name), AssetType::Image))
                .collect(),
        };
        let urls = project.selected_urls(&[1, 3]);

        let temp_dir = tempdir().unwrap();
        let job = FetchJob::new(urls, temp_dir.path())
            .with_naming(NamingPolicy::from_prefix(Some("art_".to_string())));
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(job, &mut SkipPrompt, Some(progress.get_callback()))
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(progress.progress_updates(), vec![(1, 3), (2, 3), (3, 3)]);

        // Names follow processing order, and each file holds the matching asset
        for (index, name) in ["a.jpg", "c.jpg", "e.jpg"].iter().enumerate() {
            let saved = temp_dir.path().join(format!("art_{}.jpg", index + 1));
            assert_eq!(tokio::fs::read(&saved).await.unwrap(), name.as_bytes());
        }
        assert_eq!(file_count(temp_dir.path()), 3);
    }

    #[tokio::test]
    async fn test_http_error_does_not_stop_run() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "1.jpg", b"one", "image/jpeg").await;
        mount_status(&server, "8k", "2.jpg", 404).await;
        mount_image(&server, "8k", "3.jpg", b"three", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let urls = vec![
            asset_url(&server, "1.jpg"),
            asset_url(&server, "2.jpg"),
            asset_url(&server, "3.jpg"),
        ];
        let job = FetchJob::new(urls, temp_dir.path())
            .with_naming(NamingPolicy::from_prefix(Some("img".to_string())));
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(job, &mut SkipPrompt, Some(progress.get_callback()))
            .await
            .unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.processed, 3);
        assert!(!summary.rate_limited);
        assert!(temp_dir.path().join("img1.jpg").exists());
        assert!(!temp_dir.path().join("img2.jpg").exists());
        assert!(temp_dir.path().join("img3.jpg").exists());

        let logs = progress.log_lines();
        assert_eq!(logs.len(), 3);
        assert!(logs[1].starts_with("! HTTP error while downloading"));
        assert!(logs[1].contains("404"));
        assert_eq!(
            summary.summary_line(),
            ">>> 3 Files - Skipped: 0, Errors: 1, Warnings: 0"
        );
    }

    #[tokio::test]
    async fn test_rate_limit_halts_remaining_run() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "1.jpg", b"one", "image/jpeg").await;
        mount_status(&server, "8k", "2.jpg", 429).await;
        mount_image(&server, "8k", "3.jpg", b"three", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let urls = vec![
            asset_url(&server, "1.jpg"),
            asset_url(&server, "2.jpg"),
            asset_url(&server, "3.jpg"),
        ];
        let job = FetchJob::new(urls, temp_dir.path());
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(job, &mut SkipPrompt, Some(progress.get_callback()))
            .await
            .unwrap();

        assert!(summary.rate_limited);
        assert!(!summary.completed());
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.total, 3);

        // Item 3 was never requested
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert!(temp_dir.path().join("1.jpg").exists());
        assert!(!temp_dir.path().join("3.jpg").exists());

        assert_eq!(progress.count_events_of_type("rate_limited"), 1);
        assert_eq!(progress.progress_updates(), vec![(1, 3)]);
        let logs = progress.log_lines();
        assert_eq!(logs.len(), 2);
        assert!(logs[1].starts_with("! 429 Too Many Requests"));
    }

    #[tokio::test]
    async fn test_timeout_is_an_item_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/assets/images/8k/slow.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        mount_image(&server, "8k", "fast.jpg", b"fast", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let config = DownloadConfig::builder()
            .timeout(Duration::from_millis(300))
            .build();
        let urls = vec![asset_url(&server, "slow.jpg"), asset_url(&server, "fast.jpg")];
        let progress = ProgressCapture::new();

        let summary = Fetcher::new(config)
            .unwrap()
            .fetch_all(
                FetchJob::new(urls, temp_dir.path()),
                &mut SkipPrompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.processed, 2);
        assert!(progress.log_lines()[0].starts_with("! Timeout reached while fetching"));
        assert!(temp_dir.path().join("fast.jpg").exists());
    }

    #[tokio::test]
    async fn test_short_body_is_kept_with_warning() {
        let base = serve_raw_once(raw_head(1000), vec![vec![7u8; 950]], Duration::ZERO).await;
        let url = format!("{}/p/assets/images/large/001.jpg?1", base);

        let temp_dir = tempdir().unwrap();
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(
                FetchJob::new(vec![url], temp_dir.path()),
                &mut SkipPrompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.saved(), 1);
        assert_eq!(
            progress.log_lines(),
            vec![
                "* Saved: \"001.jpg\" with 950 B - Warning: File size mismatch between local copy and server by 50 B"
                    .to_string()
            ]
        );

        let saved = temp_dir.path().join("001.jpg");
        assert_eq!(tokio::fs::read(&saved).await.unwrap().len(), 950);
        assert!(!temp_dir.path().join("001.jpg.part").exists());
    }

    #[tokio::test]
    async fn test_slow_stream_within_read_timeout_completes() {
        let pieces = vec![vec![1u8; 100]; 6];
        let base = serve_raw_once(raw_head(600), pieces, Duration::from_millis(400)).await;
        let url = format!("{}/p/assets/images/large/001.jpg?1", base);

        let temp_dir = tempdir().unwrap();
        let config = DownloadConfig::builder()
            .timeout(Duration::from_secs(1))
            .build();
        let progress = ProgressCapture::new();

        let summary = Fetcher::new(config)
            .unwrap()
            .fetch_all(
                FetchJob::new(vec![url], temp_dir.path()),
                &mut SkipPrompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(summary.errors, 0);
        assert_eq!(
            progress.log_lines(),
            vec!["+ Saved: \"001.jpg\" with 600 B".to_string()]
        );
        assert_eq!(
            tokio::fs::read(temp_dir.path().join("001.jpg")).await.unwrap().len(),
            600
        );
    }

    #[tokio::test]
    async fn test_encoded_body_is_stored_as_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/assets/images/8k/001.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .insert_header("content-encoding", "gzip")
                    .set_body_bytes(b"raw-gzip-bytes".to_vec()),
            )
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(
                FetchJob::new(vec![asset_url(&server, "001.jpg")], temp_dir.path()),
                &mut SkipPrompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        // Not decoded, so the declared length matches what is written
        assert_eq!(summary.warnings, 0);
        assert_eq!(summary.errors, 0);
        assert_eq!(
            tokio::fs::read(temp_dir.path().join("001.jpg")).await.unwrap(),
            b"raw-gzip-bytes"
        );

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("accept-encoding").is_none());
    }

    #[tokio::test]
    async fn test_missing_output_dir_fails_before_any_request() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "1.jpg", b"one", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let job = FetchJob::new(
            vec![asset_url(&server, "1.jpg")],
            temp_dir.path().join("does-not-exist"),
        );

        let err = test_fetcher()
            .fetch_all(job, &mut SkipPrompt, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::OutputDirectoryMissing { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_job() {
        let temp_dir = tempdir().unwrap();
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(
                FetchJob::new(Vec::new(), temp_dir.path()),
                &mut SkipPrompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(summary, RunSummary::new(0));
        assert!(summary.completed());
        assert_eq!(progress.count_events_of_type("log"), 0);
        assert_eq!(progress.count_events_of_type("run_finished"), 1);
    }
}

#[cfg(test)]
mod collision_tests {
    use super::*;

    #[tokio::test]
    async fn test_skip_existing_is_idempotent() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "1.jpg", b"one", "image/jpeg").await;
        mount_image(&server, "8k", "2.png", b"two", "image/png").await;

        let temp_dir = tempdir().unwrap();
        let urls = vec![asset_url(&server, "1.jpg"), asset_url(&server, "2.png")];
        let fetcher = test_fetcher();

        let first = fetcher
            .fetch_all(FetchJob::new(urls.clone(), temp_dir.path()), &mut SkipPrompt, None)
            .await
            .unwrap();
        assert_eq!(first.saved(), 2);
        assert_eq!(file_count(temp_dir.path()), 2);

        let progress = ProgressCapture::new();
        let second = fetcher
            .fetch_all(
                FetchJob::new(urls, temp_dir.path()),
                &mut SkipPrompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(second.skipped, 2);
        assert_eq!(second.saved(), 0);
        assert_eq!(file_count(temp_dir.path()), 2);
        assert_eq!(
            progress.log_lines(),
            vec![
                "^ Skipped \"1.jpg\" as it already exists".to_string(),
                "^ Skipped \"2.png\" as it already exists".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rename_keeps_original_file() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "001.jpg", b"new-bytes", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        let original = temp_dir.path().join("001.jpg");
        tokio::fs::write(&original, b"old").await.unwrap();

        let mut prompted = Vec::new();
        let mut prompt = |base: &str| {
            prompted.push(base.to_string());
            RenameDecision::Rename("newname".to_string())
        };
        let progress = ProgressCapture::new();

        let summary = test_fetcher()
            .fetch_all(
                FetchJob::new(vec![asset_url(&server, "001.jpg")], temp_dir.path())
                    .with_skip_existing(false),
                &mut prompt,
                Some(progress.get_callback()),
            )
            .await
            .unwrap();

        assert_eq!(prompted, vec!["001".to_string()]);
        assert_eq!(summary.saved(), 1);
        assert_eq!(tokio::fs::read(&original).await.unwrap(), b"old");
        assert_eq!(
            tokio::fs::read(temp_dir.path().join("newname.jpg")).await.unwrap(),
            b"new-bytes"
        );
        assert_eq!(
            progress.log_lines(),
            vec!["+ Saved \"001.jpg\" as: \"newname.jpg\" with 9 B".to_string()]
        );
    }

    #[tokio::test]
    async fn test_skip_all_stops_prompting() {
        let server = MockServer::start().await;
        mount_image(&server, "8k", "1.jpg", b"one", "image/jpeg").await;
        mount_image(&server, "8k", "2.jpg", b"two", "image/jpeg").await;
        mount_image(&server, "8k", "3.jpg", b"three", "image/jpeg").await;

        let temp_dir = tempdir().unwrap();
        for name in ["1.jpg", "2.jpg"] {
            tokio::fs::write(temp_dir.path().join(name), b"old").await.unwrap();
        }

        let mut prompts = 0;
        let mut prompt = |_: &str| {
            prompts += 1;
            RenameDecision::SkipAll
        };
        let urls = vec![
            asset_url(&server, "1.jpg"),
            asset_url(&server, "2.jpg"),
            asset_url(&server, "3.jpg"),
        ];

        let summary = test_fetcher()
            .fetch_all(
                FetchJob::new(urls, temp_dir.path()).with_skip_existing(false),
                &mut prompt,
                None,
            )
            .await
            .unwrap();

        assert_eq!(prompts, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.saved(), 1);
        assert_eq!(tokio::fs::read(temp_dir.path().join("2.jpg")).await.unwrap(), b"old");
        assert_eq!(tokio::fs::read(temp_dir.path().join("3.jpg")).await.unwrap(), b"three");
    }
}

//! End-to-end tests driving the router in-process.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vtrain_api::{create_router, ApiConfig, AppState};
use vtrain_inference::{CompletionRequest, ContentPart, InferenceClient, InferenceResult, RetryPolicy};
use vtrain_media::{FrameExtractor, MediaResult};
use vtrain_pipeline::{Pipeline, PipelineConfig};

const BOUNDARY: &str = "vtrain-test-boundary";

/// Answers frame requests and summary requests with fixed text.
struct FakeClient {
    frame_reply: String,
    summary_reply: String,
    frame_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

#[async_trait]
impl InferenceClient for FakeClient {
    async fn complete(&self, request: CompletionRequest) -> InferenceResult<String> {
        let has_image = request
            .messages
            .iter()
            .flat_map(|m| m.content.iter())
            .any(|part| matches!(part, ContentPart::ImageDataUrl(_)));

        if has_image {
            self.frame_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.frame_reply.clone())
        } else {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.summary_reply.clone())
        }
    }
}

/// Writes a fixed number of frame files.
struct FakeExtractor {
    count: usize,
}

#[async_trait]
impl FrameExtractor for FakeExtractor {
    async fn extract(&self, _video: &Path, out_dir: &Path, _fps: f64) -> MediaResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;
        let mut frames = Vec::new();
        for i in 1..=self.count {
            let path = out_dir.join(format!("frame_{:04}.jpg", i));
            tokio::fs::write(&path, b"\xFF\xD8jpeg").await?;
            frames.push(path);
        }
        Ok(frames)
    }
}

struct TestApp {
    router: Router,
    client: Arc<FakeClient>,
    dir: TempDir,
}

impl TestApp {
    fn new(frame_count: usize, frame_reply: &str, summary_reply: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(FakeClient {
            frame_reply: frame_reply.to_string(),
            summary_reply: summary_reply.to_string(),
            frame_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        });

        let config = PipelineConfig {
            sample_fps: 1.0,
            max_frames: 10,
            upload_dir: dir.path().join("uploads"),
            frames_dir: dir.path().join("frames"),
            retry: RetryPolicy::new("test").with_base_delay(Duration::from_millis(1)),
            ..Default::default()
        };
        let pipeline = Pipeline::new(config, client.clone(), Arc::new(FakeExtractor { count: frame_count }));
        let state = AppState::new(ApiConfig::default(), Arc::new(pipeline));

        Self {
            router: create_router(state, None),
            client,
            dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn assert_no_leftovers(&self) {
        for sub in ["uploads", "frames"] {
            let path = self.dir.path().join(sub);
            if !path.exists() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(&path).await.unwrap();
            assert!(entries.next_entry().await.unwrap().is_none(), "{} not empty", sub);
        }
    }
}

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: video/mp4\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn json_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const FRAME_80: &str = r#"{"timestamp": 0, "description": "Holding the torch", "errors": [], "safety_issues": [], "skill_score": 80}"#;

#[tokio::test]
async fn root_returns_status_ok() {
    let app = TestApp::new(1, FRAME_80, "{}");
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn health_reports_version() {
    let app = TestApp::new(1, FRAME_80, "{}");
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn json_without_video_path_is_rejected() {
    let app = TestApp::new(1, FRAME_80, "{}");

    for body in [r#"{}"#, r#"{"videoPath": "  "}"#, r#"{"bucket": "x"}"#, "not json"] {
        let (status, response) = app.send(json_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response, json!({ "error": "No 'videoPath' in request" }));
    }
    assert_eq!(app.client.frame_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn storage_request_without_storage_is_server_error() {
    let app = TestApp::new(1, FRAME_80, "{}");

    let (status, body) = app
        .send(json_request(r#"{"videoPath": "user/run.mp4", "bucket": "submission-videos"}"#))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Object storage is not configured");
}

#[tokio::test]
async fn multipart_without_video_part_is_rejected() {
    let app = TestApp::new(1, FRAME_80, "{}");

    let (status, body) = app.send(multipart_request("file", "run.mp4", b"data")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No 'video' file part in request" }));
}

#[tokio::test]
async fn multipart_with_empty_filename_is_rejected() {
    let app = TestApp::new(1, FRAME_80, "{}");

    let (status, body) = app.send(multipart_request("video", "", b"data")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No selected file" }));
}

#[tokio::test]
async fn upload_with_unparsable_summary_uses_frame_average() {
    let app = TestApp::new(5, FRAME_80, "Great job overall, keep practicing.");

    let (status, body) = app.send(multipart_request("video", "weld.mp4", b"video-bytes")).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let job_id = body["job_id"].as_str().unwrap();
    assert!(!job_id.is_empty());
    assert_eq!(body["video_filename"], format!("{}.mp4", job_id));

    let frames = body["frame_analyses"].as_array().unwrap();
    assert_eq!(frames.len(), 5);
    let timestamps: Vec<f64> = frames.iter().map(|f| f["timestamp"].as_f64().unwrap()).collect();
    assert_eq!(timestamps, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert!(frames.iter().all(|f| f["skill_score"] == 80));
    assert_eq!(frames[4]["frame_file"], "frame_0005.jpg");

    assert_eq!(
        body["metrics"],
        json!({
            "overallScore": 80,
            "accuracy": 80,
            "stability": 80,
            "toolUsage": 80,
            "completionTime": "N/A"
        })
    );
    assert_eq!(body["feedback"], "Great job overall, keep practicing.");
    assert_eq!(body["final_summary"], body["feedback"]);

    assert_eq!(app.client.frame_calls.load(Ordering::SeqCst), 5);
    assert_eq!(app.client.summary_calls.load(Ordering::SeqCst), 1);
    app.assert_no_leftovers().await;
}

#[tokio::test]
async fn upload_with_structured_summary() {
    let summary = r#"{"overallScore": 72, "accuracy": 70, "stability": 75, "toolUsage": 68,
                      "completionTime": "1m 30s", "feedback": "Steady hands."}"#;
    let app = TestApp::new(3, FRAME_80, summary);

    let (status, body) = app.send(multipart_request("video", "clip.MOV", b"video")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["overallScore"], 72);
    assert_eq!(body["metrics"]["completionTime"], "1m 30s");
    assert_eq!(body["feedback"], "Steady hands.");
    app.assert_no_leftovers().await;
}

#[tokio::test]
async fn zero_frames_is_server_error_without_aggregation() {
    let app = TestApp::new(0, FRAME_80, "{}");

    let (status, body) = app.send(multipart_request("video", "empty.mp4", b"video")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "No frames extracted from video" }));
    assert_eq!(app.client.summary_calls.load(Ordering::SeqCst), 0);
    app.assert_no_leftovers().await;
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new(1, FRAME_80, "{}");
    let request = Request::builder()
        .uri("/")
        .header("X-Request-ID", "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

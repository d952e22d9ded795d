//! Test doubles for the pipeline's collaborators.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vtrain_inference::{CompletionRequest, InferenceClient, InferenceError, InferenceResult, RetryPolicy};
use vtrain_media::{FrameExtractor, MediaError, MediaResult};
use vtrain_storage::{StorageResult, VideoFetcher, VideoSource};

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new("test")
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(1))
}

/// Replays scripted responses in order and records every request.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<InferenceResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<InferenceResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> InferenceResult<String> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::invalid_response("script exhausted")))
    }
}

/// Writes `count` fake JPEG frames into the output directory.
pub struct FakeExtractor {
    pub count: usize,
    pub panic: bool,
}

impl FakeExtractor {
    pub fn frames(count: usize) -> Arc<Self> {
        Arc::new(Self { count, panic: false })
    }
}

#[async_trait]
impl FrameExtractor for FakeExtractor {
    async fn extract(&self, video_path: &Path, out_dir: &Path, _fps: f64) -> MediaResult<Vec<PathBuf>> {
        if self.panic {
            panic!("extractor exploded");
        }
        if !video_path.exists() {
            return Err(MediaError::FileNotFound(video_path.to_path_buf()));
        }

        tokio::fs::create_dir_all(out_dir).await?;
        let mut frames = Vec::new();
        for i in 1..=self.count {
            let path = out_dir.join(format!("frame_{:04}.jpg", i));
            tokio::fs::write(&path, [0xFF, 0xD8, i as u8]).await?;
            frames.push(path);
        }
        Ok(frames)
    }
}

/// Writes fixed bytes to the destination.
#[derive(Default)]
pub struct FakeFetcher {
    pub fetched: AtomicBool,
}

#[async_trait]
impl VideoFetcher for FakeFetcher {
    async fn fetch(&self, _source: &VideoSource, dest: &Path) -> StorageResult<u64> {
        self.fetched.store(true, Ordering::SeqCst);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"video").await?;
        Ok(5)
    }
}

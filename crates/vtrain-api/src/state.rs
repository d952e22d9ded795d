//! Application state.

use std::sync::Arc;

use tracing::{info, warn};
use vtrain_inference::OpenAiClient;
use vtrain_media::{check_ffmpeg, FfmpegFrameExtractor};
use vtrain_pipeline::{Pipeline, PipelineConfig};
use vtrain_storage::{S3Storage, StorageConfig, StorageVideoFetcher};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Build the production pipeline from environment variables.
    ///
    /// Object storage is optional; without it only direct uploads work.
    pub fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        match check_ffmpeg() {
            Ok(path) => info!("Using ffmpeg at {}", path.display()),
            Err(e) => warn!("{}; frame extraction will fail", e),
        }

        let pipeline_config = PipelineConfig::from_env();
        info!(
            "Pipeline config: fps={}, max_frames={}, concurrency={}, vision_model={}",
            pipeline_config.sample_fps,
            pipeline_config.max_frames,
            pipeline_config.concurrency,
            pipeline_config.vision_model
        );

        let client = Arc::new(OpenAiClient::from_env()?);
        let extractor = match config.ffmpeg_timeout_secs {
            Some(secs) => FfmpegFrameExtractor::new().with_timeout(secs),
            None => FfmpegFrameExtractor::new(),
        };
        let extractor = Arc::new(extractor);
        let mut pipeline = Pipeline::new(pipeline_config, client, extractor);

        match StorageConfig::from_env() {
            Ok(storage_config) => {
                let signer = Arc::new(S3Storage::new(&storage_config));
                let fetcher = StorageVideoFetcher::from_config(signer, &storage_config)?;
                pipeline = pipeline.with_fetcher(Arc::new(fetcher));
                info!("Object storage enabled at {}", storage_config.endpoint_url);
            }
            Err(e) => warn!("Object storage disabled: {}", e),
        }

        Ok(Self::new(config, Arc::new(pipeline)))
    }
}

//! Pipeline configuration.

use std::path::PathBuf;

use tracing::warn;
use vtrain_inference::RetryPolicy;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frames per second handed to the extractor
    pub sample_fps: f64,
    /// Upper bound on frames sent to the vision model per job
    pub max_frames: usize,
    /// In-flight per-frame calls; 1 means strictly sequential
    pub concurrency: usize,
    pub vision_model: String,
    pub summary_model: String,
    pub frame_max_tokens: u32,
    pub summary_max_tokens: u32,
    /// Directory holding downloaded and uploaded videos
    pub upload_dir: PathBuf,
    /// Root directory for per-job frame directories
    pub frames_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_fps: 1.0,
            max_frames: 10,
            concurrency: 1,
            vision_model: "gpt-4o-mini".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            frame_max_tokens: 500,
            summary_max_tokens: 800,
            upload_dir: PathBuf::from("uploads"),
            frames_dir: PathBuf::from("frames"),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let sample_fps = match env_parse::<f64>("FRAME_SAMPLE_FPS") {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            Some(fps) => {
                warn!("Ignoring FRAME_SAMPLE_FPS={}, must be positive", fps);
                defaults.sample_fps
            }
            None => defaults.sample_fps,
        };

        Self {
            sample_fps,
            max_frames: env_parse("MAX_FRAMES_TO_ANALYZE")
                .unwrap_or(defaults.max_frames)
                .max(1),
            concurrency: env_parse("FRAME_ANALYSIS_CONCURRENCY")
                .unwrap_or(defaults.concurrency)
                .max(1),
            vision_model: std::env::var("VISION_MODEL").unwrap_or(defaults.vision_model),
            summary_model: std::env::var("SUMMARY_MODEL").unwrap_or(defaults.summary_model),
            frame_max_tokens: env_parse("FRAME_MAX_TOKENS").unwrap_or(defaults.frame_max_tokens),
            summary_max_tokens: env_parse("SUMMARY_MAX_TOKENS")
                .unwrap_or(defaults.summary_max_tokens),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            frames_dir: std::env::var("FRAMES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frames_dir),
            retry: RetryPolicy::from_env(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

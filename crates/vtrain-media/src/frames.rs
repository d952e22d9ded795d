//! Frame extraction at a fixed sampling rate.
//!
//! The pipeline only relies on the contract of [`FrameExtractor`]: given a
//! video and a rate, produce an ordered list of still images whose position
//! in the list is their temporal order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Output pattern handed to FFmpeg; numbering starts at 1 and is zero padded.
pub const FRAME_FILE_PATTERN: &str = "frame_%04d.jpg";

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = "jpg";

/// Produces ordered still frames from a video file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract frames from `video_path` into `out_dir` at `fps` frames per second.
    ///
    /// Returns the frame paths sorted in temporal order.
    async fn extract(&self, video_path: &Path, out_dir: &Path, fps: f64) -> MediaResult<Vec<PathBuf>>;
}

/// [`FrameExtractor`] backed by the `ffmpeg` binary.
#[derive(Debug, Default)]
pub struct FfmpegFrameExtractor {
    timeout_secs: Option<u64>,
}

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill FFmpeg if extraction runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(&self, video_path: &Path, out_dir: &Path, fps: f64) -> MediaResult<Vec<PathBuf>> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(MediaError::InvalidSampleRate(fps));
        }
        if !video_path.exists() {
            return Err(MediaError::FileNotFound(video_path.to_path_buf()));
        }

        tokio::fs::create_dir_all(out_dir).await?;

        let cmd = FfmpegCommand::new(video_path, out_dir.join(FRAME_FILE_PATTERN))
            .video_filter(format!("fps={}", fps))
            .quality(2);

        self.runner().run(&cmd).await?;

        let frames = list_frames(out_dir).await?;
        info!(
            "Extracted {} frames from {} at {} fps",
            frames.len(),
            video_path.display(),
            fps
        );
        Ok(frames)
    }
}

/// List extracted frame files in `dir`, sorted by name.
///
/// The zero-padded numbering makes name order equal to temporal order.
pub async fn list_frames(dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FRAME_PREFIX))
            && path.extension().and_then(|e| e.to_str()) == Some(FRAME_EXTENSION);

        if is_frame && entry.file_type().await?.is_file() {
            frames.push(path);
        } else {
            debug!("Ignoring non-frame entry {}", path.display());
        }
    }

    frames.sort();
    Ok(frames)
}

//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Object storage is not configured")]
    StorageNotConfigured,

    #[error("Failed to download video: {0}")]
    Download(#[from] vtrain_storage::StorageError),

    #[error("ffmpeg failed: {0}")]
    Extraction(#[from] vtrain_media::MediaError),

    #[error("No frames extracted from video")]
    NoFrames,

    #[error("Analysis failed for all {0} sampled frames")]
    AllFramesFailed(usize),

    #[error("Inference error: {0}")]
    Inference(#[from] vtrain_inference::InferenceError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// True if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_))
    }

    /// Short label used for failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::StorageNotConfigured => "storage_not_configured",
            PipelineError::Download(_) => "download",
            PipelineError::Extraction(_) => "extraction",
            PipelineError::NoFrames => "no_frames",
            PipelineError::AllFramesFailed(_) => "all_frames_failed",
            PipelineError::Inference(_) => "inference",
            PipelineError::Unexpected(_) => "unexpected",
            PipelineError::Io(_) => "io",
        }
    }
}

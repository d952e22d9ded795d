//! FFmpeg CLI wrapper for video frame extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with timeout and captured stderr
//! - The `FrameExtractor` seam used by the analysis pipeline

pub mod command;
pub mod error;
pub mod frames;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{list_frames, FfmpegFrameExtractor, FrameExtractor, FRAME_FILE_PATTERN};

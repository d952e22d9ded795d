//! VTrain analysis pipeline.
//!
//! A job moves through `created → downloaded → extracted → analyzed →
//! aggregated → done`:
//! 1. The video is fetched (remote sources only) and split into frames
//! 2. An evenly spaced subset of frames is selected
//! 3. Each selected frame is assessed by a vision model
//! 4. The per-frame records are reduced to one report
//!
//! Temporary files are removed on every exit path.

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod json;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod sampler;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use aggregator::{parse_report, Aggregator};
pub use analyzer::{FrameAnalyzer, FrameResponse};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use orchestrator::{JobOutcome, Pipeline};
pub use sampler::{frame_timestamp, sample_frames, sample_indices, SampledFrame};
pub use workspace::{normalize_extension, JobWorkspace};

//! Shared data models for the vtrain backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their lifecycle stages
//! - Per-frame skill assessments
//! - The aggregated per-job report

pub mod analysis;
pub mod job;
pub mod report;

// Re-export common types
pub use analysis::FrameAnalysis;
pub use job::{JobId, JobStage};
pub use report::{
    clamp_score, AggregateReport, ReportMetrics, COMPLETION_TIME_NOT_APPLICABLE, SCORE_MAX, SCORE_MIN,
};

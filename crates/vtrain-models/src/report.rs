//! Aggregated per-job report.

use serde::{Deserialize, Serialize};

/// Lowest valid sub-score.
pub const SCORE_MIN: i64 = 0;
/// Highest valid sub-score.
pub const SCORE_MAX: i64 = 100;

/// Completion-time value used when no estimate is available.
pub const COMPLETION_TIME_NOT_APPLICABLE: &str = "N/A";

/// Numeric part of the report, serialized with the field names clients expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetrics {
    pub overall_score: u8,
    pub accuracy: u8,
    pub stability: u8,
    pub tool_usage: u8,
    pub completion_time: String,
}

impl ReportMetrics {
    /// All four sub-scores set to the same value.
    pub fn uniform(score: u8) -> Self {
        Self {
            overall_score: score,
            accuracy: score,
            stability: score,
            tool_usage: score,
            completion_time: COMPLETION_TIME_NOT_APPLICABLE.to_string(),
        }
    }

    pub fn scores(&self) -> [u8; 4] {
        [self.overall_score, self.accuracy, self.stability, self.tool_usage]
    }
}

/// The single structured result of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub metrics: ReportMetrics,
    /// Markdown narrative
    pub feedback: String,
}

/// Clamp an arbitrary integer into the valid score range.
pub fn clamp_score(value: i64) -> u8 {
    value.clamp(SCORE_MIN, SCORE_MAX) as u8
}

//! Per-frame skill assessment.

use serde::{Deserialize, Serialize};

/// Structured assessment of one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Seconds from the start of the source video
    pub timestamp: f64,
    /// What the trainee is doing in this frame
    pub description: String,
    /// Mistakes or technique issues
    #[serde(default)]
    pub errors: Vec<String>,
    /// Safety concerns
    #[serde(default)]
    pub safety_issues: Vec<String>,
    /// Execution quality, always within [0, 100]
    pub skill_score: u8,
    /// File name of the analyzed frame within the job's frame directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_file: Option<String>,
}

impl FrameAnalysis {
    /// A well-formed record standing in for a response that could not be parsed.
    pub fn degraded(timestamp: f64, raw_text: &str) -> Self {
        Self {
            timestamp,
            description: raw_text.trim().to_string(),
            errors: Vec::new(),
            safety_issues: Vec::new(),
            skill_score: 0,
            frame_file: None,
        }
    }

    pub fn with_frame_file(mut self, frame_file: impl Into<String>) -> Self {
        self.frame_file = Some(frame_file.into());
        self
    }
}

//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    pub const JOBS_TOTAL: &str = "vtrain_jobs_total";
    pub const JOB_DURATION: &str = "vtrain_job_duration_seconds";
    pub const FRAMES_ANALYZED: &str = "vtrain_frames_analyzed_total";
    pub const AGGREGATION_FALLBACKS: &str = "vtrain_aggregation_fallbacks_total";
}

/// Record a finished job; `failure_reason` is `None` on success.
pub fn record_job(duration: Duration, failure_reason: Option<&'static str>) {
    let status = if failure_reason.is_some() { "failed" } else { "completed" };
    counter!(
        names::JOBS_TOTAL,
        "status" => status,
        "reason" => failure_reason.unwrap_or("none")
    )
    .increment(1);
    histogram!(names::JOB_DURATION, "status" => status).record(duration.as_secs_f64());
}

/// Record one frame outcome: `parsed`, `degraded` or `failed`.
pub fn record_frame(outcome: &'static str) {
    counter!(names::FRAMES_ANALYZED, "outcome" => outcome).increment(1);
}

/// Record an aggregation fallback tier: `relaxed` or `local`.
pub fn record_aggregation_fallback(tier: &'static str) {
    counter!(names::AGGREGATION_FALLBACKS, "tier" => tier).increment(1);
}

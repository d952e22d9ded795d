//! Reduction of per-frame records into one report.
//!
//! Three tiers, each only reached when the previous one yields nothing usable:
//! a structured-output call, a relaxed call that asks for JSON in plain text,
//! and a local mean over the frame scores.

use std::sync::Arc;

use tracing::{info, warn};
use vtrain_inference::{ChatMessage, CompletionRequest, InferenceClient, InferenceResult, RetryPolicy};
use vtrain_models::{
    clamp_score, AggregateReport, FrameAnalysis, ReportMetrics, COMPLETION_TIME_NOT_APPLICABLE,
};

use crate::json::{parse_object, score_value, text_value};
use crate::metrics;
use crate::prompts::{summary_prompt, SUMMARY_SYSTEM_PROMPT};

/// Feedback used when no model text at all could be obtained.
pub const FALLBACK_FEEDBACK: &str = "Automatic feedback is unavailable for this submission. \
The scores shown are the average of the per-frame skill scores.";

pub struct Aggregator {
    client: Arc<dyn InferenceClient>,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl Aggregator {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        model: impl Into<String>,
        max_tokens: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            retry: retry.for_operation("aggregation"),
        }
    }

    /// Produce the job report. Never fails.
    pub async fn aggregate(&self, analyses: &[FrameAnalysis]) -> AggregateReport {
        let raw = match self.call(analyses, true).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Structured aggregation failed, retrying with relaxed prompt: {}", e);
                metrics::record_aggregation_fallback("relaxed");
                match self.call(analyses, false).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("Relaxed aggregation failed: {}", e);
                        None
                    }
                }
            }
        };

        if let Some(report) = raw.as_deref().and_then(parse_report) {
            info!(
                overall_score = report.metrics.overall_score,
                "Aggregated {} frame analyses",
                analyses.len()
            );
            return report;
        }

        warn!("Aggregation output unusable, computing scores locally");
        metrics::record_aggregation_fallback("local");
        local_report(analyses, raw.as_deref())
    }

    async fn call(&self, analyses: &[FrameAnalysis], strict: bool) -> InferenceResult<String> {
        let request = CompletionRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user_text(summary_prompt(analyses, strict)),
            ],
            self.max_tokens,
        )
        .json_mode(strict);

        self.retry
            .run(|_| {
                let request = request.clone();
                async move { self.client.complete(request).await }
            })
            .await
    }
}

/// Parse an aggregation response into a report.
///
/// Returns `None` unless the text holds a JSON object. Missing or
/// non-numeric scores become 0; every score is rounded and clamped.
pub fn parse_report(raw: &str) -> Option<AggregateReport> {
    let object = parse_object(raw)?;
    let field = |camel: &str, snake: &str| object.get(camel).or_else(|| object.get(snake));
    let score = |camel: &str, snake: &str| field(camel, snake).and_then(score_value).unwrap_or(0);

    let completion_time = text_value(field("completionTime", "completion_time"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| COMPLETION_TIME_NOT_APPLICABLE.to_string());

    Some(AggregateReport {
        metrics: ReportMetrics {
            overall_score: score("overallScore", "overall_score"),
            accuracy: score("accuracy", "accuracy"),
            stability: score("stability", "stability"),
            tool_usage: score("toolUsage", "tool_usage"),
            completion_time,
        },
        feedback: text_value(object.get("feedback")).unwrap_or_default(),
    })
}

/// Report derived only from the frame scores.
pub fn local_report(analyses: &[FrameAnalysis], raw: Option<&str>) -> AggregateReport {
    let feedback = raw
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FEEDBACK.to_string());

    AggregateReport {
        metrics: ReportMetrics::uniform(mean_score(analyses)),
        feedback,
    }
}

/// Mean skill score rounded to the nearest integer; 0 for no records.
pub fn mean_score(analyses: &[FrameAnalysis]) -> u8 {
    if analyses.is_empty() {
        return 0;
    }

    let total: u64 = analyses.iter().map(|a| u64::from(a.skill_score)).sum();
    let count = analyses.len() as u64;
    clamp_score(((2 * total + count) / (2 * count)) as i64)
}

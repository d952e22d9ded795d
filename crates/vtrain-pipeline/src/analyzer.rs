//! Per-frame vision analysis.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;
use vtrain_inference::{
    ChatMessage, CompletionRequest, ContentPart, InferenceClient, InferenceResult, RetryPolicy,
};
use vtrain_models::FrameAnalysis;

use crate::json::{parse_object, score_value, string_list, text_value};
use crate::metrics;
use crate::prompts::{frame_prompt, FRAME_SYSTEM_PROMPT};

/// Outcome of parsing one frame response.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameResponse {
    /// Well-formed record; its timestamp is assigned by [`FrameResponse::into_analysis`].
    Parsed(FrameAnalysis),
    /// The model output could not be used; the raw text is kept.
    Degraded { raw_text: String },
}

impl FrameResponse {
    /// Parse raw model output.
    ///
    /// Anything other than a JSON object carrying a `timestamp` key is degraded.
    pub fn parse(raw: &str) -> Self {
        match parse_object(raw) {
            Some(object) if object.contains_key("timestamp") => Self::Parsed(from_object(&object)),
            _ => Self::Degraded {
                raw_text: raw.to_string(),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FrameResponse::Degraded { .. })
    }

    /// Final record stamped with the frame's known timestamp.
    pub fn into_analysis(self, timestamp: f64) -> FrameAnalysis {
        match self {
            FrameResponse::Parsed(analysis) => FrameAnalysis {
                timestamp,
                ..analysis
            },
            FrameResponse::Degraded { raw_text } => FrameAnalysis::degraded(timestamp, &raw_text),
        }
    }
}

fn from_object(object: &Map<String, Value>) -> FrameAnalysis {
    FrameAnalysis {
        timestamp: 0.0,
        description: text_value(object.get("description")).unwrap_or_default(),
        errors: string_list(object.get("errors")),
        safety_issues: string_list(object.get("safety_issues")),
        skill_score: object.get("skill_score").and_then(score_value).unwrap_or(0),
        frame_file: None,
    }
}

/// Sends one frame at a time to the vision model.
pub struct FrameAnalyzer {
    client: Arc<dyn InferenceClient>,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl FrameAnalyzer {
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
            retry: retry.for_operation("frame_analysis"),
        }
    }

    fn request(&self, image: &[u8], timestamp: f64) -> CompletionRequest {
        CompletionRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(FRAME_SYSTEM_PROMPT),
                ChatMessage::user(vec![
                    ContentPart::text(frame_prompt(timestamp)),
                    ContentPart::jpeg(image),
                ]),
            ],
            self.max_tokens,
        )
        .json_mode(true)
    }

    /// Analyze one JPEG frame.
    ///
    /// Unusable output yields a degraded record; only inference failures
    /// that survive the retry policy are returned as errors.
    pub async fn analyze(&self, image: &[u8], timestamp: f64) -> InferenceResult<FrameAnalysis> {
        let request = self.request(image, timestamp);

        let raw = self
            .retry
            .run(|attempt| {
                let request = request.clone();
                debug!(attempt, timestamp, "Requesting frame analysis");
                async move { self.client.complete(request).await }
            })
            .await?;

        let response = FrameResponse::parse(&raw);
        metrics::record_frame(if response.is_degraded() { "degraded" } else { "parsed" });
        Ok(response.into_analysis(timestamp))
    }
}

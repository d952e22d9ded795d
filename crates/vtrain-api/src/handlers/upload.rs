//! Video upload and analysis.

use std::path::Path;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::info;
use vtrain_models::{FrameAnalysis, JobId, ReportMetrics};
use vtrain_pipeline::{JobOutcome, PipelineError};
use vtrain_storage::VideoSource;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const MISSING_VIDEO_PART: &str = "No 'video' file part in request";
pub const EMPTY_FILENAME: &str = "No selected file";
pub const MISSING_VIDEO_PATH: &str = "No 'videoPath' in request";

/// Body of a storage-referenced analysis request.
#[derive(Debug, Deserialize)]
pub struct RemoteUploadRequest {
    #[serde(rename = "videoPath", default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Analysis result returned to the client.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub job_id: JobId,
    pub video_filename: String,
    pub frame_analyses: Vec<FrameAnalysis>,
    pub final_summary: String,
    pub metrics: ReportMetrics,
    pub feedback: String,
}

impl From<JobOutcome> for AnalysisResponse {
    fn from(outcome: JobOutcome) -> Self {
        Self {
            job_id: outcome.job_id,
            video_filename: outcome.video_filename,
            frame_analyses: outcome.frame_analyses,
            final_summary: outcome.report.feedback.clone(),
            metrics: outcome.report.metrics,
            feedback: outcome.report.feedback,
        }
    }
}

/// Analyze a training video.
///
/// `multipart/form-data` bodies must carry the file in a `video` part; any
/// other body is read as JSON `{"videoPath": ..., "bucket": ...}`.
pub async fn upload(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<AnalysisResponse>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

    let outcome = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        analyze_multipart(&state, multipart).await
    } else {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        analyze_remote(&state, &body).await
    }
    .map_err(|e| e.redact(&state.config))?;

    Ok(Json(outcome.into()))
}

async fn analyze_multipart(state: &AppState, mut multipart: Multipart) -> ApiResult<JobOutcome> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().trim().to_string())
            .unwrap_or_default();
        if filename.is_empty() {
            return Err(ApiError::bad_request(EMPTY_FILENAME));
        }

        let extension = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);
        let workspace = state
            .pipeline
            .create_workspace(extension.as_deref())
            .await?;

        let mut file = tokio::fs::File::create(workspace.video_path())
            .await
            .map_err(PipelineError::from)?;
        let mut written = 0usize;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(PipelineError::from)?;
            written += chunk.len();
        }
        file.flush().await.map_err(PipelineError::from)?;
        drop(file);

        info!(job_id = %workspace.job_id(), "Received upload {} ({} bytes)", filename, written);
        return Ok(state.pipeline.run_workspace(workspace).await?);
    }

    Err(ApiError::bad_request(MISSING_VIDEO_PART))
}

async fn analyze_remote(state: &AppState, body: &[u8]) -> ApiResult<JobOutcome> {
    let request: RemoteUploadRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request(MISSING_VIDEO_PATH))?;

    let video_path = request
        .video_path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request(MISSING_VIDEO_PATH))?;

    let bucket = request
        .bucket
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| state.config.default_bucket.clone());

    info!("Analyzing stored video {}/{}", bucket, video_path);
    Ok(state
        .pipeline
        .run_remote(&VideoSource::new(bucket, video_path))
        .await?)
}

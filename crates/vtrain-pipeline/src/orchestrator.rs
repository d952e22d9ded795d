//! Job orchestration.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tracing::Instrument;
use vtrain_inference::InferenceClient;
use vtrain_media::FrameExtractor;
use vtrain_models::{AggregateReport, FrameAnalysis, JobId, JobStage};
use vtrain_storage::{VideoFetcher, VideoSource};

use crate::aggregator::Aggregator;
use crate::analyzer::FrameAnalyzer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::sampler::{sample_frames, SampledFrame};
use crate::workspace::{normalize_extension, JobWorkspace};

/// Result of a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub video_filename: String,
    pub frame_analyses: Vec<FrameAnalysis>,
    pub report: AggregateReport,
}

/// Runs jobs end to end. One instance is shared by all requests.
pub struct Pipeline {
    config: PipelineConfig,
    extractor: Arc<dyn FrameExtractor>,
    fetcher: Option<Arc<dyn VideoFetcher>>,
    analyzer: FrameAnalyzer,
    aggregator: Aggregator,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        client: Arc<dyn InferenceClient>,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        let analyzer = FrameAnalyzer::new(
            client.clone(),
            config.vision_model.clone(),
            config.frame_max_tokens,
            config.retry.clone(),
        );
        let aggregator = Aggregator::new(
            client,
            config.summary_model.clone(),
            config.summary_max_tokens,
            config.retry.clone(),
        );

        Self {
            config,
            extractor,
            fetcher: None,
            analyzer,
            aggregator,
        }
    }

    /// Enable jobs that reference videos in object storage.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn VideoFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Allocate a fresh job workspace whose video path uses `extension`.
    pub async fn create_workspace(&self, extension: Option<&str>) -> PipelineResult<JobWorkspace> {
        let workspace = JobWorkspace::create(
            &self.config.upload_dir,
            &self.config.frames_dir,
            JobId::new(),
            &normalize_extension(extension),
        )
        .await?;
        Ok(workspace)
    }

    /// Run a job whose video is already at `workspace.video_path()`.
    pub async fn run_workspace(&self, workspace: JobWorkspace) -> PipelineResult<JobOutcome> {
        self.run(workspace, None).await
    }

    /// Fetch a video from storage and run a job on it.
    pub async fn run_remote(&self, source: &VideoSource) -> PipelineResult<JobOutcome> {
        if self.fetcher.is_none() {
            return Err(PipelineError::StorageNotConfigured);
        }

        let workspace = self.create_workspace(source.extension().as_deref()).await?;
        self.run(workspace, Some(source)).await
    }

    async fn run(
        &self,
        workspace: JobWorkspace,
        source: Option<&VideoSource>,
    ) -> PipelineResult<JobOutcome> {
        let logger = JobLogger::new(workspace.job_id(), "video_analysis");
        let started = Instant::now();
        logger.log_start(&workspace.video_filename());

        let result = AssertUnwindSafe(self.process(&workspace, &logger, source))
            .catch_unwind()
            .instrument(logger.create_span())
            .await
            .unwrap_or_else(|panic| Err(PipelineError::unexpected(panic_message(panic))));

        workspace.cleanup().await;

        match &result {
            Ok(outcome) => {
                metrics::record_job(started.elapsed(), None);
                logger.log_completion(&format!(
                    "{} frames analyzed, overall score {}",
                    outcome.frame_analyses.len(),
                    outcome.report.metrics.overall_score
                ));
            }
            Err(e) => {
                metrics::record_job(started.elapsed(), Some(e.reason()));
                logger.log_error(&e.to_string());
            }
        }

        result
    }

    async fn process(
        &self,
        workspace: &JobWorkspace,
        logger: &JobLogger,
        source: Option<&VideoSource>,
    ) -> PipelineResult<JobOutcome> {
        logger.log_stage(JobStage::Created, &workspace.video_path().display().to_string());

        if let Some(source) = source {
            let fetcher = self.fetcher.as_ref().ok_or(PipelineError::StorageNotConfigured)?;
            let bytes = fetcher.fetch(source, workspace.video_path()).await?;
            logger.log_stage(
                JobStage::Downloaded,
                &format!("{} bytes from {}/{}", bytes, source.bucket, source.path),
            );
        }

        let frames = self
            .extractor
            .extract(workspace.video_path(), workspace.frames_dir(), self.config.sample_fps)
            .await?;
        if frames.is_empty() {
            return Err(PipelineError::NoFrames);
        }
        logger.log_stage(JobStage::Extracted, &format!("{} frames", frames.len()));

        let sampled = sample_frames(&frames, self.config.max_frames, self.config.sample_fps);
        let attempted = sampled.len();

        // Built before streaming: a borrowing closure inside the stream makes the job future non-Send.
        let pending: Vec<_> = sampled
            .iter()
            .map(|frame| self.analyze_frame(frame, logger))
            .collect();
        let results: Vec<Option<FrameAnalysis>> = futures::stream::iter(pending)
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;
        let frame_analyses: Vec<FrameAnalysis> = results.into_iter().flatten().collect();

        if frame_analyses.is_empty() {
            return Err(PipelineError::AllFramesFailed(attempted));
        }
        logger.log_stage(
            JobStage::Analyzed,
            &format!("{}/{} frames analyzed", frame_analyses.len(), attempted),
        );

        let report = self.aggregator.aggregate(&frame_analyses).await;
        logger.log_stage(JobStage::Aggregated, &format!("overall score {}", report.metrics.overall_score));

        Ok(JobOutcome {
            job_id: workspace.job_id().clone(),
            video_filename: workspace.video_filename(),
            frame_analyses,
            report,
        })
    }

    /// Analyze one frame; failures are logged and the frame is skipped.
    async fn analyze_frame(&self, frame: &SampledFrame, logger: &JobLogger) -> Option<FrameAnalysis> {
        let image = match tokio::fs::read(&frame.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::record_frame("failed");
                logger.log_warning(&format!("Skipping frame {}: {}", frame.index, e));
                return None;
            }
        };

        match self.analyzer.analyze(&image, frame.timestamp).await {
            Ok(analysis) => Some(analysis.with_frame_file(frame.file_name())),
            Err(e) => {
                metrics::record_frame("failed");
                logger.log_warning(&format!(
                    "Frame {} at {:.2}s failed after retries: {}",
                    frame.index, frame.timestamp, e
                ));
                None
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "job panicked".to_string())
}

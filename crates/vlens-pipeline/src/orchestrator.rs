//! Pipeline orchestrator.
//!
//! Drives one job through
//! `Initializing → Extracting → FrameAnalysis → AudioAnalysis → Cleanup →
//! Synthesis → Settlement → Complete`, with `Failed` reachable from every
//! step. Per-batch and per-derivation failures degrade the report; media
//! failures and insufficient credits abort the job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use validator::Validate;
use vlens_gateway::InferenceGateway;
use vlens_media::{JobWorkspace, MediaError, MediaExtractor, MediaProbe, SourceRef};
use vlens_models::{
    analysis_credit_cost, AnalysisJob, AnalysisReport, AnalysisRequest, Frame, JobId, Phase,
};

use crate::audio::{attach_audio_context, AudioAnalyzer};
use crate::config::PipelineConfig;
use crate::credits::{CreditLedger, LedgerError};
use crate::error::{JobFailure, PipelineError, PipelineResult};
use crate::frame_batch::FrameBatchAnalyzer;
use crate::logging::JobLogger;
use crate::metrics;
use crate::progress::ProgressTracker;
use crate::registry::JobRegistry;
use crate::segmentation::{SceneSegmenter, SegmentationConfig};
use crate::sweeper::Sweeper;
use crate::synthesis::SynthesisStage;

/// Runs analysis jobs end to end.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    gateway: InferenceGateway,
    extractor: Arc<dyn MediaExtractor>,
    ledger: Arc<dyn CreditLedger>,
    progress: ProgressTracker,
    registry: JobRegistry,
}

/// Media made available for a job.
struct ExtractedMedia {
    duration: f64,
    frames: Vec<Frame>,
    audio: Option<PathBuf>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        gateway: InferenceGateway,
        extractor: Arc<dyn MediaExtractor>,
        ledger: Arc<dyn CreditLedger>,
    ) -> Self {
        Self {
            config: config.normalized(),
            gateway,
            extractor,
            ledger,
            progress: ProgressTracker::new(),
            registry: JobRegistry::new(),
        }
    }

    /// Share an existing progress store, e.g. with a polling surface.
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_registry(mut self, registry: JobRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Start the background sweeper for progress entries and finished jobs.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        Sweeper::new(self.progress.clone(), self.config.sweep_interval, self.config.progress_ttl)
            .with_registry(self.registry.clone(), self.config.job_ttl)
            .spawn()
    }

    /// Run one analysis job to completion.
    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisReport, JobFailure> {
        let job_id = request.job_id.clone().unwrap_or_default();
        let request = request.with_job_id(job_id.clone());
        let logger = JobLogger::new(&job_id, &request);
        let span = logger.create_span();

        async {
            if let Err(e) = request.validate() {
                let error = PipelineError::invalid_request(e.to_string());
                logger.log_error(&error.to_string());
                metrics::record_job_failure(error.kind());
                return Err(JobFailure::new(job_id.clone(), error));
            }

            if !self.registry.insert(AnalysisJob::from_request(&request)) {
                let error = PipelineError::invalid_request("a job with this id is already running");
                logger.log_error(&error.to_string());
                metrics::record_job_failure(error.kind());
                return Err(JobFailure::new(job_id.clone(), error));
            }
            self.registry.modify(&job_id, |job| job.start());

            logger.log_start(&request.source);
            let started = Instant::now();
            self.progress
                .update(&job_id, Phase::Initializing, 0, "Job accepted", None);

            let workspace = match JobWorkspace::create(&self.config.work_dir, job_id.as_str()).await {
                Ok(workspace) => workspace,
                Err(e) => return Err(self.fail(&job_id, &logger, started, e.into())),
            };

            match self.execute(&job_id, &request, &workspace, &logger).await {
                Ok(report) => {
                    workspace.cleanup().await;
                    self.registry.modify(&job_id, |job| job.complete());
                    self.progress
                        .update(&job_id, Phase::Complete, 100, "Analysis complete", None);
                    metrics::record_job("completed", started.elapsed().as_secs_f64());
                    logger.log_completion(report.frames.len(), report.scenes.len(), report.credits_charged);
                    Ok(report)
                }
                Err(error) => {
                    workspace.cleanup().await;
                    Err(self.fail(&job_id, &logger, started, error))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job_id: &JobId,
        request: &AnalysisRequest,
        workspace: &JobWorkspace,
        logger: &JobLogger,
    ) -> PipelineResult<AnalysisReport> {
        let mode = request.mode;
        let fps = mode.frames_per_second();

        // Initializing: acquire, probe, pre-flight credit check.
        let source = SourceRef::parse(&request.source)?;
        self.progress
            .update(job_id, Phase::Initializing, 2, "Acquiring source", None);
        let media = self.extractor.acquire(&source, workspace).await?;
        let probe = self.extractor.probe(&media).await?;

        let cost = analysis_credit_cost(probe.duration, mode, self.config.seconds_per_credit);
        self.check_balance(&request.user_id, cost, logger).await?;
        self.progress.update(
            job_id,
            Phase::Initializing,
            5,
            format!("Source ready ({:.1}s)", probe.duration),
            Some(serde_json::json!({ "duration": probe.duration, "credits": cost })),
        );

        // Extracting
        self.progress
            .update(job_id, Phase::Extracting, 5, "Extracting frames and audio", None);
        let extracted = self.extract(&media, &probe, fps, workspace, logger).await?;
        self.progress.update(
            job_id,
            Phase::Extracting,
            10,
            format!("Extracted {} frames", extracted.frames.len()),
            Some(serde_json::json!({ "frames": extracted.frames.len() })),
        );

        // FrameAnalysis: 10-70, updated per batch.
        let analyzer = FrameBatchAnalyzer::new(self.gateway.clone(), self.config.batch_size);
        let records = analyzer.analyze(job_id, &extracted.frames, &self.progress).await;

        // AudioAnalysis, then segmentation.
        self.progress
            .update(job_id, Phase::AudioAnalysis, 70, "Analyzing audio", None);
        let transcript = AudioAnalyzer::new(self.gateway.clone())
            .analyze(job_id, extracted.audio.as_deref(), extracted.duration)
            .await;

        self.progress
            .update(job_id, Phase::AudioAnalysis, 72, "Segmenting scenes", None);
        let segmenter = SceneSegmenter::new(SegmentationConfig::from_pipeline(&self.config, fps));
        let mut scenes = segmenter.segment(&records);
        attach_audio_context(&mut scenes, &transcript);
        metrics::record_scenes(scenes.len());
        self.progress.update(
            job_id,
            Phase::AudioAnalysis,
            75,
            format!("Found {} scenes", scenes.len()),
            Some(serde_json::json!({ "scenes": scenes.len() })),
        );

        // Cleanup: media is no longer needed.
        workspace.cleanup().await;
        self.progress
            .update(job_id, Phase::Cleanup, 76, "Removed temporary media", None);

        // Synthesis: 78-95.
        let synthesis = SynthesisStage::new(self.gateway.clone(), self.config.scene_context_batch)
            .run(job_id, &mut scenes, &transcript, extracted.duration, &self.progress)
            .await;

        // Settlement
        self.progress
            .update(job_id, Phase::Settlement, 96, "Settling credits", None);
        self.settle(job_id, &request.user_id, cost, logger).await?;

        Ok(AnalysisReport {
            job_id: job_id.clone(),
            source: request.source.clone(),
            mode,
            duration: extracted.duration,
            frame_count: records.len() as u32,
            sampling_interval: mode.sampling_interval(),
            frames: records,
            transcript,
            scenes,
            category: synthesis.category,
            hooks: synthesis.hooks,
            narrative: synthesis.narrative,
            summary: synthesis.summary,
            credits_charged: cost,
            generated_at: Utc::now(),
        })
    }

    /// Frame and audio extraction run concurrently. Audio failures degrade;
    /// frame failures abort.
    async fn extract(
        &self,
        media: &Path,
        probe: &MediaProbe,
        fps: u32,
        workspace: &JobWorkspace,
        logger: &JobLogger,
    ) -> PipelineResult<ExtractedMedia> {
        let frames_fut = self.extractor.extract_frames(media, fps, workspace);
        let audio_fut = async {
            if probe.has_audio {
                Some(self.extractor.extract_audio(media, workspace).await)
            } else {
                None
            }
        };
        let (frames, audio) = tokio::join!(frames_fut, audio_fut);

        let paths = frames?;
        if paths.is_empty() {
            return Err(MediaError::NoFramesExtracted(media.to_path_buf()).into());
        }

        let audio = match audio {
            Some(Ok(path)) => Some(path),
            Some(Err(e)) => {
                logger.log_warning(&format!("Audio extraction failed, continuing without audio: {e}"));
                None
            }
            None => None,
        };

        let interval = 1.0 / f64::from(fps.max(1));
        let frames = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| Frame::new(i as u32, interval, path))
            .collect();

        Ok(ExtractedMedia {
            duration: probe.duration.max(0.0),
            frames,
            audio,
        })
    }

    /// Fail early when the balance is known to be short. An unreachable
    /// ledger defers the decision to settlement.
    async fn check_balance(&self, user_id: &str, cost: u32, logger: &JobLogger) -> PipelineResult<()> {
        match self.ledger.get_balance(user_id).await {
            Ok(available) if available < u64::from(cost) => Err(PipelineError::InsufficientCredits {
                required: cost,
                available,
            }),
            Ok(_) => Ok(()),
            Err(e) => {
                logger.log_warning(&format!("Balance check unavailable, settling after analysis: {e}"));
                Ok(())
            }
        }
    }

    async fn settle(&self, job_id: &JobId, user_id: &str, cost: u32, logger: &JobLogger) -> PipelineResult<()> {
        match self.ledger.debit(user_id, cost, job_id.as_str()).await {
            Ok(balance) => {
                metrics::record_credits_charged(cost);
                logger.log_step(&format!("Charged {cost} credits, {balance} remaining"));
                Ok(())
            }
            Err(LedgerError::InsufficientFunds { required, available }) => {
                Err(PipelineError::InsufficientCredits { required, available })
            }
            Err(LedgerError::Unavailable(message)) => Err(PipelineError::ledger(message)),
        }
    }

    fn fail(&self, job_id: &JobId, logger: &JobLogger, started: Instant, error: PipelineError) -> JobFailure {
        let message = error.to_string();
        logger.log_error(&message);

        let percent = self.progress.read(job_id).map(|e| e.percent).unwrap_or(0);
        self.progress.update(
            job_id,
            Phase::Failed,
            percent,
            message.clone(),
            Some(serde_json::json!({ "kind": error.kind() })),
        );
        self.registry.modify(job_id, |job| job.fail(message));

        metrics::record_job("failed", started.elapsed().as_secs_f64());
        metrics::record_job_failure(error.kind());

        JobFailure::new(job_id.clone(), error)
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .field("jobs", &self.registry.len())
            .finish_non_exhaustive()
    }
}

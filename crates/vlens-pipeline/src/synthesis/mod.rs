//! Synthesis stage: report derivations built from scenes and transcript.
//!
//! Each derivation makes its own inference call and carries its own canned
//! fallback, so one failing derivation never blocks the others. Ordering:
//!
//! 1. category ∥ hooks
//! 2. scene context ∥ narrative
//! 3. strategic summary (needs category, hooks and narrative)

mod category;
mod context;
mod hooks;
mod narrative;
mod summary;

pub use category::{classify_category, fallback_category};
pub use context::{analyze_scene_context, fallback_scene_context};
pub use hooks::{extract_hooks, sanitize_hooks};
pub use narrative::{analyze_narrative, fallback_narrative};
pub use summary::{fallback_summary, summarize};

use serde::de::DeserializeOwned;
use tracing::{info, warn};
use vlens_gateway::{InferenceGateway, InferenceOutcome, InferenceRequest, Lane, ModelTier};
use vlens_models::{
    AudioTranscript, CategoryAnalysis, Derived, Hook, JobId, NarrativeAnalysis, Phase, Scene,
    StrategicSummary,
};

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::progress::ProgressTracker;
use crate::response_parser::parse_json;

/// Results of every synthesis derivation.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub category: Derived<CategoryAnalysis>,
    pub hooks: Derived<Vec<Hook>>,
    pub narrative: Derived<NarrativeAnalysis>,
    pub summary: Derived<StrategicSummary>,
    /// Scene-context batches that fell back to canned readings
    pub degraded_context_batches: usize,
}

/// Runs the synthesis derivations for one job.
#[derive(Debug, Clone)]
pub struct SynthesisStage {
    gateway: InferenceGateway,
    scene_context_batch: usize,
}

impl SynthesisStage {
    pub fn new(gateway: InferenceGateway, scene_context_batch: usize) -> Self {
        Self {
            gateway,
            scene_context_batch: scene_context_batch.max(1),
        }
    }

    /// Run every derivation. Scene contexts are written into `scenes`.
    pub async fn run(
        &self,
        job_id: &JobId,
        scenes: &mut [Scene],
        transcript: &AudioTranscript,
        duration: f64,
        progress: &ProgressTracker,
    ) -> SynthesisOutput {
        progress.update(job_id, Phase::Synthesis, 78, "Classifying category and hooks", None);
        let (category, hooks) = tokio::join!(
            classify_category(&self.gateway, scenes, transcript),
            extract_hooks(&self.gateway, scenes, transcript, duration),
        );

        progress.update(job_id, Phase::Synthesis, 84, "Analyzing scene context and narrative", None);
        let narrative_scenes = scenes.to_vec();
        let (degraded_context_batches, narrative) = tokio::join!(
            analyze_scene_context(&self.gateway, scenes, self.scene_context_batch),
            analyze_narrative(&self.gateway, &narrative_scenes, transcript),
        );

        progress.update(job_id, Phase::Synthesis, 90, "Writing strategic summary", None);
        let summary = summarize(
            &self.gateway,
            &category.value,
            &hooks.value,
            &narrative.value,
            scenes,
        )
        .await;

        progress.update(job_id, Phase::Synthesis, 95, "Synthesis complete", None);
        info!(
            job_id = %job_id,
            category = category.value.category.as_str(),
            hooks = hooks.value.len(),
            degraded_context_batches,
            category_degraded = category.degraded,
            hooks_degraded = hooks.degraded,
            narrative_degraded = narrative.degraded,
            summary_degraded = summary.degraded,
            "Synthesis finished"
        );

        SynthesisOutput {
            category,
            hooks,
            narrative,
            summary,
            degraded_context_batches,
        }
    }
}

/// JSON request on the parallel lane.
fn json_request(label: impl Into<String>, prompt: String, tier: ModelTier) -> InferenceRequest {
    InferenceRequest::new(label)
        .with_text(prompt)
        .with_tier(tier)
        .with_lane(Lane::Parallel)
        .json()
}

/// Invoke `request` and parse its reply as `T`.
async fn invoke_json<T: DeserializeOwned>(
    gateway: &InferenceGateway,
    request: InferenceRequest,
) -> PipelineResult<T> {
    let label = request.label.clone();
    match gateway.invoke(request).await? {
        InferenceOutcome::Completed(reply) => parse_json(&reply.text),
        InferenceOutcome::Declined(declined) => Err(PipelineError::declined(label, declined.reason)),
    }
}

/// Wrap a derivation result, substituting `fallback` on error.
fn derived_or<T>(step: &'static str, result: PipelineResult<T>, fallback: impl FnOnce() -> T) -> Derived<T> {
    match result {
        Ok(value) => Derived::generated(value),
        Err(e) => {
            warn!(step, error = %e, "Synthesis step fell back");
            metrics::record_synthesis_fallback(step);
            Derived::fallback(fallback())
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use vlens_gateway::{
        GatewayConfig, InferenceGateway, InferenceRequest, InferenceTransport, TransportError,
        TransportReply,
    };

    /// Replies by label prefix; anything else is a server error.
    pub struct PrefixTransport {
        replies: Vec<(String, String)>,
        pub labels: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InferenceTransport for PrefixTransport {
        async fn send(&self, _model: &str, request: &InferenceRequest) -> Result<TransportReply, TransportError> {
            self.labels.lock().unwrap().push(request.label.clone());
            self.replies
                .iter()
                .find(|(prefix, _)| request.label.starts_with(prefix.as_str()))
                .map(|(_, text)| Ok(TransportReply::text(text.clone())))
                .unwrap_or(Err(TransportError::Server {
                    status: 500,
                    message: "boom".to_string(),
                }))
        }
    }

    pub fn gateway(replies: &[(&str, &str)]) -> (InferenceGateway, Arc<PrefixTransport>) {
        let transport = Arc::new(PrefixTransport {
            replies: replies.iter().map(|(p, t)| (p.to_string(), t.to_string())).collect(),
            labels: Mutex::new(Vec::new()),
        });
        let gateway = InferenceGateway::new(GatewayConfig::for_testing(), transport.clone());
        (gateway, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::gateway;
    use super::*;
    use vlens_models::VideoCategory;

    fn scenes() -> Vec<Scene> {
        vec![Scene::new(0, 0, 3, 0.5), Scene::new(1, 4, 11, 0.5)]
    }

    #[tokio::test]
    async fn test_run_all_steps_succeed() {
        let (gateway, transport) = gateway(&[
            ("category", r#"{"category": "tutorial", "confidence": 0.9, "rationale": "step by step"}"#),
            ("hooks", r#"{"hooks": [{"timestamp": 1.0, "type": "question", "description": "asks", "impact": "high"}]}"#),
            ("scene_context", r#"{"scenes": [{"scene": 0, "intent": "i0", "execution": "e0", "impact": "m0"}, {"scene": 1, "intent": "i1", "execution": "e1", "impact": "m1"}]}"#),
            ("narrative", r#"{"intent": "teach", "structure": "linear", "message": "cook"}"#),
            ("summary", r#"{"summary": "good", "strengths": ["clear"]}"#),
        ]);
        let stage = SynthesisStage::new(gateway, 4);
        let progress = ProgressTracker::new();
        let job_id = JobId::from_string("job");
        let mut scenes = scenes();

        let output = stage
            .run(&job_id, &mut scenes, &AudioTranscript::default(), 6.0, &progress)
            .await;

        assert_eq!(output.category.value.category, VideoCategory::Tutorial);
        assert!(!output.category.degraded);
        assert_eq!(output.hooks.value.len(), 1);
        assert_eq!(output.narrative.value.intent, "teach");
        assert_eq!(output.summary.value.strengths, vec!["clear".to_string()]);
        assert_eq!(output.degraded_context_batches, 0);
        assert_eq!(scenes[1].context.as_ref().map(|c| c.intent.as_str()), Some("i1"));

        let entry = progress.read(&job_id).unwrap();
        assert_eq!((entry.phase, entry.percent), (Phase::Synthesis, 95));

        let labels = transport.labels.lock().unwrap().clone();
        let position = |p: &str| labels.iter().position(|l| l.starts_with(p)).unwrap();
        assert!(position("summary") > position("narrative"));
        assert!(position("summary") > position("category"));
        assert!(position("summary") > position("hooks"));
    }

    #[tokio::test]
    async fn test_each_step_falls_back_independently() {
        let (gateway, _) = gateway(&[
            ("hooks", r#"{"hooks": []}"#),
            ("narrative", "not json at all"),
        ]);
        let stage = SynthesisStage::new(gateway, 1);
        let mut scenes = scenes();

        let output = stage
            .run(
                &JobId::from_string("job"),
                &mut scenes,
                &AudioTranscript::default(),
                6.0,
                &ProgressTracker::new(),
            )
            .await;

        assert!(output.category.degraded);
        assert_eq!(output.category.value.category, VideoCategory::Other);
        assert!(!output.hooks.degraded);
        assert!(output.narrative.degraded);
        assert!(output.summary.degraded);
        assert_eq!(output.degraded_context_batches, 2);
        assert!(scenes.iter().all(|s| s.context.is_some()));
    }
}

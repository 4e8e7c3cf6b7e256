//! Transcript and separated-audio analysis.

use std::path::Path;

use tracing::{info, warn};
use vlens_gateway::{InferenceGateway, InferenceOutcome, InferenceRequest, Payload};
use vlens_models::{AudioTranscript, JobId, Scene};

use crate::error::{PipelineError, PipelineResult};
use crate::prompts::audio_prompt;
use crate::response_parser::parse_json;

/// Runs the single audio call of a job.
#[derive(Debug, Clone)]
pub struct AudioAnalyzer {
    gateway: InferenceGateway,
}

impl AudioAnalyzer {
    pub fn new(gateway: InferenceGateway) -> Self {
        Self { gateway }
    }

    /// Transcribe and judge the audio track at `audio`.
    ///
    /// Never fails: a missing track, a declined call or an unusable reply
    /// all yield a degraded, empty transcript.
    pub async fn analyze(&self, job_id: &JobId, audio: Option<&Path>, duration: f64) -> AudioTranscript {
        let Some(path) = audio else {
            info!(job_id = %job_id, "No audio track, skipping audio analysis");
            return AudioTranscript::degraded();
        };

        match self.try_analyze(path, duration).await {
            Ok(transcript) => {
                info!(
                    job_id = %job_id,
                    segments = transcript.segments.len(),
                    priority = transcript.separated.priority.as_str(),
                    "Audio analysis complete"
                );
                transcript
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Audio analysis degraded");
                AudioTranscript::degraded()
            }
        }
    }

    async fn try_analyze(&self, path: &Path, duration: f64) -> PipelineResult<AudioTranscript> {
        let bytes = tokio::fs::read(path).await?;
        let request = InferenceRequest::new("audio")
            .with_text(audio_prompt(duration))
            .with_part(Payload::mp3(bytes))
            .with_max_output_tokens(8192)
            .json();

        let reply = match self.gateway.invoke(request).await? {
            InferenceOutcome::Completed(reply) => reply,
            InferenceOutcome::Declined(declined) => {
                return Err(PipelineError::declined("audio", declined.reason));
            }
        };

        let mut transcript: AudioTranscript = parse_json(&reply.text)?;
        transcript.degraded = false;
        transcript.normalize();
        for segment in &mut transcript.segments {
            segment.start = segment.start.clamp(0.0, duration.max(0.0));
            segment.end = segment.end.clamp(segment.start, duration.max(segment.start));
        }
        Ok(transcript)
    }
}

/// Attach the transcript text spoken during each scene.
pub fn attach_audio_context(scenes: &mut [Scene], transcript: &AudioTranscript) {
    for scene in scenes {
        scene.audio_context = transcript.text_between(scene.start_time, scene.end_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use vlens_gateway::{GatewayConfig, InferenceTransport, TransportError, TransportReply};
    use vlens_models::{AudioPriority, TranscriptSegment};

    struct FixedTransport(Result<TransportReply, TransportError>);

    #[async_trait]
    impl InferenceTransport for FixedTransport {
        async fn send(&self, _model: &str, _request: &InferenceRequest) -> Result<TransportReply, TransportError> {
            self.0.clone()
        }
    }

    fn analyzer(reply: Result<TransportReply, TransportError>) -> AudioAnalyzer {
        let gateway = InferenceGateway::new(GatewayConfig::for_testing(), Arc::new(FixedTransport(reply)));
        AudioAnalyzer::new(gateway)
    }

    fn audio_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("audio.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        path
    }

    const REPLY: &str = r#"```json
{
  "segments": [
    {"start": 3.0, "end": 5.0, "text": "and that's the recipe"},
    {"start": 0.0, "end": 2.5, "text": "welcome back"}
  ],
  "separated": {"dialogue": "host speaks", "confidence": 1.4, "priority": "dialogue"}
}
```"#;

    #[tokio::test]
    async fn test_analyze_parses_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(&dir);
        let transcript = analyzer(Ok(TransportReply::text(REPLY)))
            .analyze(&JobId::from_string("job"), Some(&path), 6.0)
            .await;

        assert!(!transcript.degraded);
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "welcome back");
        assert_eq!(transcript.separated.priority, AudioPriority::Dialogue);
        assert!((transcript.separated.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_no_audio_skips_call() {
        let transcript = analyzer(Err(TransportError::Network("unreachable".into())))
            .analyze(&JobId::from_string("job"), None, 6.0)
            .await;
        assert!(transcript.degraded);
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn test_failures_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(&dir);

        let declined = analyzer(Ok(TransportReply::blocked("SAFETY")))
            .analyze(&JobId::from_string("job"), Some(&path), 6.0)
            .await;
        assert!(declined.degraded);

        let garbage = analyzer(Ok(TransportReply::text("no json here")))
            .analyze(&JobId::from_string("job"), Some(&path), 6.0)
            .await;
        assert!(garbage.degraded);

        let missing = analyzer(Ok(TransportReply::text(REPLY)))
            .analyze(&JobId::from_string("job"), Some(&dir.path().join("nope.mp3")), 6.0)
            .await;
        assert!(missing.degraded);
    }

    #[test]
    fn test_attach_audio_context() {
        let transcript = AudioTranscript {
            segments: vec![
                TranscriptSegment { start: 0.0, end: 1.5, text: "hello".into() },
                TranscriptSegment { start: 2.5, end: 4.0, text: "goodbye".into() },
            ],
            ..Default::default()
        };
        let mut scenes = vec![Scene::new(0, 0, 3, 0.5), Scene::new(1, 4, 11, 0.5)];
        attach_audio_context(&mut scenes, &transcript);
        assert_eq!(scenes[0].audio_context, "hello");
        assert_eq!(scenes[1].audio_context, "goodbye");
    }
}

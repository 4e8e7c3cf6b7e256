//! Hook extraction.

use serde::Deserialize;
use vlens_gateway::{InferenceGateway, ModelTier};
use vlens_models::{AudioTranscript, Derived, Hook, Scene};

use super::{derived_or, invoke_json, json_request};
use crate::prompts::hooks_prompt;

#[derive(Debug, Deserialize)]
struct HooksReply {
    #[serde(default)]
    hooks: Vec<Hook>,
}

/// Extract timestamp-anchored hooks. Falls back to an empty list.
pub async fn extract_hooks(
    gateway: &InferenceGateway,
    scenes: &[Scene],
    transcript: &AudioTranscript,
    duration: f64,
) -> Derived<Vec<Hook>> {
    let request = json_request("hooks", hooks_prompt(scenes, transcript, duration), ModelTier::Standard);
    let result = invoke_json::<HooksReply>(gateway, request)
        .await
        .map(|reply| sanitize_hooks(reply.hooks, duration));
    derived_or("hooks", result, Vec::new)
}

/// Drop hooks without a usable timestamp, clamp the rest to the video and
/// sort them by time.
pub fn sanitize_hooks(hooks: Vec<Hook>, duration: f64) -> Vec<Hook> {
    let end = duration.max(0.0);
    let mut hooks: Vec<Hook> = hooks
        .into_iter()
        .filter(|h| h.timestamp.is_finite())
        .map(|mut h| {
            h.timestamp = h.timestamp.clamp(0.0, end);
            h.description = h.description.trim().to_string();
            h
        })
        .collect();
    hooks.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlens_models::{HookType, Impact};

    fn hook(timestamp: f64) -> Hook {
        Hook {
            timestamp,
            hook_type: HookType::Visual,
            description: " flash ".to_string(),
            impact: Impact::Medium,
        }
    }

    #[test]
    fn test_sanitize_sorts_and_clamps() {
        let hooks = sanitize_hooks(vec![hook(9.0), hook(f64::NAN), hook(-1.0), hook(2.0)], 6.0);
        let times: Vec<f64> = hooks.iter().map(|h| h.timestamp).collect();
        assert_eq!(times, vec![0.0, 2.0, 6.0]);
        assert_eq!(hooks[0].description, "flash");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_empty() {
        let (gateway, _) = super::super::test_support::gateway(&[]);
        let derived = extract_hooks(&gateway, &[], &AudioTranscript::default(), 6.0).await;
        assert!(derived.degraded);
        assert!(derived.value.is_empty());
    }
}

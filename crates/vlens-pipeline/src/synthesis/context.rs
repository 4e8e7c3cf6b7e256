//! Per-scene contextual analysis, batched and dispatched concurrently.

use futures::future::join_all;
use serde::Deserialize;
use tracing::debug;
use vlens_gateway::{InferenceGateway, ModelTier};
use vlens_models::{Scene, SceneContext};

use super::{derived_or, invoke_json, json_request};
use crate::prompts::scene_context_prompt;

#[derive(Debug, Deserialize)]
struct ContextReply {
    #[serde(default)]
    scenes: Vec<ContextItem>,
}

#[derive(Debug, Deserialize)]
struct ContextItem {
    scene: u32,
    #[serde(default)]
    intent: String,
    #[serde(default)]
    execution: String,
    #[serde(default)]
    impact: String,
}

/// Fill `context` on every scene. Returns the number of batches that fell back.
///
/// Scenes the model skipped inside a successful batch get the canned reading
/// without counting as a degraded batch.
pub async fn analyze_scene_context(
    gateway: &InferenceGateway,
    scenes: &mut [Scene],
    batch_size: usize,
) -> usize {
    let batch_size = batch_size.max(1);
    let requests = scenes.chunks(batch_size).enumerate().map(|(batch_no, batch)| {
        let request = json_request(
            format!("scene_context_{batch_no}"),
            scene_context_prompt(batch),
            ModelTier::Standard,
        );
        async move {
            let result = invoke_json::<ContextReply>(gateway, request).await;
            derived_or("scene_context", result, || ContextReply { scenes: Vec::new() })
        }
    });
    let replies = join_all(requests).await;

    let mut degraded = 0;
    for (batch, reply) in scenes.chunks_mut(batch_size).zip(replies) {
        if reply.degraded {
            degraded += 1;
        }
        for scene in batch.iter_mut() {
            let item = reply.value.scenes.iter().find(|item| item.scene == scene.index);
            scene.context = Some(match item {
                Some(item) => SceneContext {
                    intent: item.intent.clone(),
                    execution: item.execution.clone(),
                    impact: item.impact.clone(),
                },
                None => {
                    debug!(scene = scene.index, "No context returned for scene");
                    fallback_scene_context(scene)
                }
            });
        }
    }
    degraded
}

/// Canned reading derived from the scene's own features.
pub fn fallback_scene_context(scene: &Scene) -> SceneContext {
    SceneContext {
        intent: match &scene.action {
            Some(action) => format!("Shows {}", action),
            None => "Not available".to_string(),
        },
        execution: match &scene.framing {
            Some(framing) => format!("Filmed as {}", framing),
            None => "Not available".to_string(),
        },
        impact: match &scene.mood {
            Some(mood) => format!("Sets a {} tone", mood),
            None => "Not available".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::gateway;
    use super::*;

    fn scenes(n: u32) -> Vec<Scene> {
        (0..n).map(|i| Scene::new(i, i * 4, i * 4 + 3, 0.5)).collect()
    }

    #[tokio::test]
    async fn test_batches_dispatched_and_merged() {
        let (gateway, transport) = gateway(&[(
            "scene_context",
            r#"{"scenes": [{"scene": 0, "intent": "open", "execution": "wide", "impact": "calm"}, {"scene": 4, "intent": "close", "execution": "tight", "impact": "tense"}]}"#,
        )]);
        let mut scenes = scenes(5);

        let degraded = analyze_scene_context(&gateway, &mut scenes, 2).await;

        assert_eq!(degraded, 0);
        assert_eq!(transport.labels.lock().unwrap().len(), 3);
        assert_eq!(scenes[0].context.as_ref().unwrap().intent, "open");
        assert_eq!(scenes[4].context.as_ref().unwrap().impact, "tense");
        assert_eq!(scenes[2].context.as_ref().unwrap().intent, "Not available");
    }

    #[test]
    fn test_fallback_uses_scene_features() {
        let mut scene = Scene::new(0, 0, 3, 0.5);
        scene.action = Some("cooking".to_string());
        let context = fallback_scene_context(&scene);
        assert_eq!(context.intent, "Shows cooking");
        assert_eq!(context.execution, "Not available");
    }
}

//! Strategic summary.

use vlens_gateway::{InferenceGateway, ModelTier};
use vlens_models::{CategoryAnalysis, Derived, Hook, NarrativeAnalysis, Scene, StrategicSummary};

use super::{derived_or, invoke_json, json_request};
use crate::prompts::summary_prompt;

/// Summarize the other derivations into strengths, weaknesses and advice.
pub async fn summarize(
    gateway: &InferenceGateway,
    category: &CategoryAnalysis,
    hooks: &[Hook],
    narrative: &NarrativeAnalysis,
    scenes: &[Scene],
) -> Derived<StrategicSummary> {
    let prompt = summary_prompt(category, hooks, narrative, scenes);
    let request = json_request("summary", prompt, ModelTier::Pro);
    let result = invoke_json::<StrategicSummary>(gateway, request).await;
    derived_or("summary", result, || fallback_summary(category, hooks.len(), scenes.len()))
}

/// Canned summary built from what is known without the model.
pub fn fallback_summary(category: &CategoryAnalysis, hook_count: usize, scene_count: usize) -> StrategicSummary {
    StrategicSummary {
        summary: format!(
            "A {} video with {} scenes and {} identified hooks. A detailed strategic summary is not available.",
            category.category.as_str().replace('_', " "),
            scene_count,
            hook_count
        ),
        strengths: Vec::new(),
        weaknesses: Vec::new(),
        recommendations: Vec::new(),
        target_audience: "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::fallback_category;

    #[test]
    fn test_fallback_summary_mentions_counts() {
        let summary = fallback_summary(&fallback_category(), 2, 5);
        assert!(summary.summary.contains("5 scenes"));
        assert!(summary.summary.contains("2 identified hooks"));
        assert!(summary.strengths.is_empty());
    }
}

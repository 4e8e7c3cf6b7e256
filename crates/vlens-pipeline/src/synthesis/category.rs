//! Category classification.

use vlens_gateway::{InferenceGateway, ModelTier};
use vlens_models::{AudioTranscript, CategoryAnalysis, Derived, Scene, VideoCategory};

use super::{derived_or, invoke_json, json_request};
use crate::prompts::category_prompt;

/// Classify the video into the closed category taxonomy.
pub async fn classify_category(
    gateway: &InferenceGateway,
    scenes: &[Scene],
    transcript: &AudioTranscript,
) -> Derived<CategoryAnalysis> {
    let request = json_request("category", category_prompt(scenes, transcript), ModelTier::Fast)
        .with_max_output_tokens(512);
    let result = invoke_json::<CategoryAnalysis>(gateway, request)
        .await
        .map(|mut analysis| {
            analysis.confidence = clamp_confidence(analysis.confidence);
            analysis
        });
    derived_or("category", result, fallback_category)
}

pub fn fallback_category() -> CategoryAnalysis {
    CategoryAnalysis {
        category: VideoCategory::Other,
        confidence: 0.0,
        rationale: "Category could not be determined".to_string(),
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::gateway;
    use super::*;

    #[tokio::test]
    async fn test_unknown_category_maps_to_other_and_clamps() {
        let (gateway, _) = gateway(&[(
            "category",
            r#"Sure! {"category": "cooking_show", "confidence": 3.5, "rationale": "food"}"#,
        )]);
        let derived = classify_category(&gateway, &[], &AudioTranscript::default()).await;
        assert!(!derived.degraded);
        assert_eq!(derived.value.category, VideoCategory::Other);
        assert!((derived.value.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(0.4), 0.4);
    }
}

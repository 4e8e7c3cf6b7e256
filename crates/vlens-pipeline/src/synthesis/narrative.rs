//! Narrative analysis.

use vlens_gateway::{InferenceGateway, ModelTier};
use vlens_models::{AudioTranscript, Derived, NarrativeAnalysis, Scene};

use super::{derived_or, invoke_json, json_request};
use crate::prompts::narrative_prompt;

pub async fn analyze_narrative(
    gateway: &InferenceGateway,
    scenes: &[Scene],
    transcript: &AudioTranscript,
) -> Derived<NarrativeAnalysis> {
    let request = json_request("narrative", narrative_prompt(scenes, transcript), ModelTier::Pro);
    let result = invoke_json::<NarrativeAnalysis>(gateway, request).await;
    derived_or("narrative", result, fallback_narrative)
}

pub fn fallback_narrative() -> NarrativeAnalysis {
    NarrativeAnalysis {
        intent: "Not available".to_string(),
        structure: "Not available".to_string(),
        message: "Narrative analysis could not be completed".to_string(),
    }
}

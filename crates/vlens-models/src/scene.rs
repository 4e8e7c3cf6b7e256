//! Scenes produced by segmentation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Intent / execution / impact reading of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SceneContext {
    pub intent: String,
    pub execution: String,
    pub impact: String,
}

/// A contiguous run of frames judged continuous by the segmentation engine.
///
/// Scenes of one analysis partition the frame range `[0, N-1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 0-based scene number
    pub index: u32,
    /// First frame (inclusive)
    pub start_frame: u32,
    /// Last frame (inclusive)
    pub end_frame: u32,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds (exclusive)
    pub end_time: f64,
    /// `frame_count × sampling_interval`
    pub duration: f64,
    /// Change score of the boundary that opened this scene
    #[serde(default)]
    pub change_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Transcript text spoken during the scene
    #[serde(default)]
    pub audio_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SceneContext>,
}

impl Scene {
    /// Create a bare scene covering `[start_frame, end_frame]`.
    pub fn new(index: u32, start_frame: u32, end_frame: u32, sampling_interval: f64) -> Self {
        let frame_count = end_frame - start_frame + 1;
        let start_time = start_frame as f64 * sampling_interval;
        let duration = frame_count as f64 * sampling_interval;
        Self {
            index,
            start_frame,
            end_frame,
            start_time,
            end_time: start_time + duration,
            duration,
            change_score: 0,
            framing: None,
            lighting: None,
            mood: None,
            action: None,
            audio_context: String::new(),
            context: None,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.end_frame - self.start_frame + 1
    }

    /// True when `frame_index` lies inside the scene.
    pub fn contains(&self, frame_index: u32) -> bool {
        (self.start_frame..=self.end_frame).contains(&frame_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_timing() {
        let scene = Scene::new(1, 4, 11, 0.5);
        assert_eq!(scene.frame_count(), 8);
        assert!((scene.start_time - 2.0).abs() < f64::EPSILON);
        assert!((scene.duration - 4.0).abs() < f64::EPSILON);
        assert!((scene.end_time - 6.0).abs() < f64::EPSILON);
        assert!(scene.contains(4));
        assert!(scene.contains(11));
        assert!(!scene.contains(12));
    }
}

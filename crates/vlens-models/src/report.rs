//! Synthesis outputs and the final analysis report.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{AnalysisMode, AudioTranscript, FrameAnalysisRecord, Hook, JobId, Scene};

/// Closed category taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoCategory {
    Advertisement,
    Tutorial,
    Entertainment,
    Vlog,
    MusicVideo,
    Documentary,
    News,
    Gaming,
    Sports,
    Educational,
    ProductReview,
    ShortFilm,
    #[default]
    #[serde(other)]
    Other,
}

impl VideoCategory {
    pub const ALL: [VideoCategory; 13] = [
        VideoCategory::Advertisement,
        VideoCategory::Tutorial,
        VideoCategory::Entertainment,
        VideoCategory::Vlog,
        VideoCategory::MusicVideo,
        VideoCategory::Documentary,
        VideoCategory::News,
        VideoCategory::Gaming,
        VideoCategory::Sports,
        VideoCategory::Educational,
        VideoCategory::ProductReview,
        VideoCategory::ShortFilm,
        VideoCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCategory::Advertisement => "advertisement",
            VideoCategory::Tutorial => "tutorial",
            VideoCategory::Entertainment => "entertainment",
            VideoCategory::Vlog => "vlog",
            VideoCategory::MusicVideo => "music_video",
            VideoCategory::Documentary => "documentary",
            VideoCategory::News => "news",
            VideoCategory::Gaming => "gaming",
            VideoCategory::Sports => "sports",
            VideoCategory::Educational => "educational",
            VideoCategory::ProductReview => "product_review",
            VideoCategory::ShortFilm => "short_film",
            VideoCategory::Other => "other",
        }
    }
}

/// Category classification with confidence and rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryAnalysis {
    pub category: VideoCategory,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    pub rationale: String,
}

/// Overall narrative reading of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NarrativeAnalysis {
    pub intent: String,
    pub structure: String,
    pub message: String,
}

/// Strategic synthesis of every other derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategicSummary {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub target_audience: String,
}

/// Output of one synthesis derivation.
///
/// `degraded` is set when the value is a canned fallback because the
/// derivation's inference call failed or was declined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Derived<T> {
    pub value: T,
    #[serde(default)]
    pub degraded: bool,
}

impl<T> Derived<T> {
    pub fn generated(value: T) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            degraded: true,
        }
    }
}

/// Final multi-part report of an analysis job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub job_id: JobId,
    pub source: String,
    pub mode: AnalysisMode,
    /// Video duration in seconds
    pub duration: f64,
    pub frame_count: u32,
    /// Seconds between sampled frames
    pub sampling_interval: f64,
    pub frames: Vec<FrameAnalysisRecord>,
    pub transcript: AudioTranscript,
    pub scenes: Vec<Scene>,
    pub category: Derived<CategoryAnalysis>,
    pub hooks: Derived<Vec<Hook>>,
    pub narrative: Derived<NarrativeAnalysis>,
    pub summary: Derived<StrategicSummary>,
    pub credits_charged: u32,
    pub generated_at: DateTime<Utc>,
}

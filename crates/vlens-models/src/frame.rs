//! Sampled frames and per-frame analysis records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A frame sampled from the source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Frame {
    /// 0-based, contiguous sequence index
    pub index: u32,
    /// Position in the video (seconds), `index × sampling_interval`
    pub timestamp: f64,
    /// Extracted image on disk
    pub path: PathBuf,
}

impl Frame {
    pub fn new(index: u32, sampling_interval: f64, path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            timestamp: index as f64 * sampling_interval,
            path: path.into(),
        }
    }
}

/// How a frame record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// The model described this frame
    Analyzed,
    /// Text copied from a neighbouring frame because the reply had too few parts
    Filler,
    /// The model refused to describe this frame
    Declined,
    /// The batch containing this frame failed
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Analyzed => "analyzed",
            RecordStatus::Filler => "filler",
            RecordStatus::Declined => "declined",
            RecordStatus::Failed => "failed",
        }
    }

    /// True when the description carries model output for some frame.
    pub fn has_content(&self) -> bool {
        matches!(self, RecordStatus::Analyzed | RecordStatus::Filler)
    }
}

/// Analysis of a single frame. Exactly one record exists per input frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameAnalysisRecord {
    /// Index of the frame this record describes
    pub frame_index: u32,
    /// Frame timestamp (seconds)
    pub timestamp: f64,
    /// Record provenance
    pub status: RecordStatus,
    /// Structured free-text description, or the failure/refusal reason
    pub description: String,
    /// Short derived meaning of the frame in context
    pub contextual_meaning: String,
}

impl FrameAnalysisRecord {
    pub fn analyzed(frame: &Frame, description: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            frame_index: frame.index,
            timestamp: frame.timestamp,
            status: RecordStatus::Analyzed,
            description: description.into(),
            contextual_meaning: meaning.into(),
        }
    }

    pub fn filler(frame: &Frame, description: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Filler,
            ..Self::analyzed(frame, description, meaning)
        }
    }

    pub fn declined(frame: &Frame, reason: impl Into<String>) -> Self {
        Self {
            frame_index: frame.index,
            timestamp: frame.timestamp,
            status: RecordStatus::Declined,
            description: reason.into(),
            contextual_meaning: "Analysis declined by model".to_string(),
        }
    }

    pub fn failed(frame: &Frame, reason: impl Into<String>) -> Self {
        Self {
            frame_index: frame.index,
            timestamp: frame.timestamp,
            status: RecordStatus::Failed,
            description: reason.into(),
            contextual_meaning: "Analysis unavailable".to_string(),
        }
    }
}

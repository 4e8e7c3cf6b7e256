//! Shared data models for the VLens analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Analysis jobs, modes and lifecycle states
//! - Frames and per-frame analysis records
//! - Audio transcripts and separated-audio judgments
//! - Scenes, hooks and synthesis outputs
//! - Progress entries polled by clients
//! - Credit cost calculation

pub mod audio;
pub mod credit_cost;
pub mod frame;
pub mod hook;
pub mod job;
pub mod progress;
pub mod report;
pub mod scene;

// Re-export common types
pub use audio::{AudioPriority, AudioTranscript, SeparatedAudio, TranscriptSegment};
pub use credit_cost::{analysis_credit_cost, SECONDS_PER_CREDIT};
pub use frame::{Frame, FrameAnalysisRecord, RecordStatus};
pub use hook::{Hook, HookType, Impact};
pub use job::{AnalysisJob, AnalysisMode, AnalysisRequest, JobId, JobState, ParseModeError};
pub use progress::{Phase, ProgressEntry};
pub use report::{
    AnalysisReport, CategoryAnalysis, Derived, NarrativeAnalysis, StrategicSummary, VideoCategory,
};
pub use scene::{Scene, SceneContext};

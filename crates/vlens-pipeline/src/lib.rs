//! Video analysis pipeline.
//!
//! This crate provides:
//! - Concurrent batched frame analysis with layered reply parsing
//! - Transcript and separated-audio analysis
//! - Deterministic weighted scene segmentation
//! - Synthesis of category, hooks, scene context, narrative and summary
//! - In-memory progress tracking and job registry with a TTL sweeper
//! - Credit pre-flight and settlement against a ledger
//! - The orchestrator tying every phase together

pub mod audio;
pub mod config;
pub mod credits;
pub mod error;
pub mod frame_batch;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod response_parser;
pub mod segmentation;
pub mod sweeper;
pub mod synthesis;

pub use audio::AudioAnalyzer;
pub use config::PipelineConfig;
pub use credits::{CreditLedger, InMemoryLedger, LedgerError};
pub use error::{JobFailure, PipelineError, PipelineResult};
pub use frame_batch::FrameBatchAnalyzer;
pub use logging::JobLogger;
pub use orchestrator::PipelineOrchestrator;
pub use progress::ProgressTracker;
pub use registry::JobRegistry;
pub use segmentation::{ChangeSignal, SceneSegmenter, SegmentationConfig, SignalSet};
pub use sweeper::Sweeper;
pub use synthesis::{SynthesisOutput, SynthesisStage};

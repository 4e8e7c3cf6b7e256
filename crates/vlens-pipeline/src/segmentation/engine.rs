//! Scene segmentation over a flat sequence of frame records.

use tracing::debug;
use vlens_models::{FrameAnalysisRecord, Scene};

use super::features::FrameFeatures;
use super::signals::SignalSet;
use crate::config::PipelineConfig;

/// Boundary rules, expressed in frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationConfig {
    /// A scene must reach this many frames before a scored boundary may close it.
    pub min_frames: u32,
    /// A scene reaching this many frames is closed regardless of score.
    pub max_frames: u32,
    /// Minimum change score for a boundary.
    pub threshold: f64,
    /// Seconds between sampled frames.
    pub sampling_interval: f64,
}

impl SegmentationConfig {
    /// Derive frame bounds from the configured scene lengths at `fps`.
    pub fn from_pipeline(config: &PipelineConfig, fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            min_frames: config.min_scene_frames(fps) as u32,
            max_frames: config.max_scene_frames(fps) as u32,
            threshold: config.change_threshold,
            sampling_interval: 1.0 / fps as f64,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default(), 2)
    }
}

/// Deterministic weighted change detector.
#[derive(Debug)]
pub struct SceneSegmenter {
    config: SegmentationConfig,
    signals: SignalSet,
}

impl SceneSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self::with_signals(config, SignalSet::default())
    }

    pub fn with_signals(config: SegmentationConfig, signals: SignalSet) -> Self {
        let min_frames = config.min_frames.max(1);
        let config = SegmentationConfig {
            min_frames,
            max_frames: config.max_frames.max(min_frames),
            ..config
        };
        Self { config, signals }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Split `records` into contiguous scenes covering every position once.
    ///
    /// Records are addressed by position; callers pass them sorted by frame index.
    pub fn segment(&self, records: &[FrameAnalysisRecord]) -> Vec<Scene> {
        if records.is_empty() {
            return Vec::new();
        }

        let features: Vec<FrameFeatures> = records.iter().map(FrameFeatures::from_record).collect();
        let SegmentationConfig {
            min_frames,
            max_frames,
            threshold,
            ..
        } = self.config;

        // (start, end, opening score)
        let mut ranges: Vec<(usize, usize, u32)> = Vec::new();
        let mut start = 0usize;
        let mut opening_score = 0u32;

        for i in 1..records.len() {
            let len = (i - start) as u32;
            let score = self.signals.score(&features[i - 1], &features[i]);

            let forced = len >= max_frames;
            let scored = f64::from(score) >= threshold && len >= min_frames;
            if forced || scored {
                debug!(
                    frame = i,
                    score,
                    forced,
                    signals = ?self.signals.triggered(&features[i - 1], &features[i]),
                    "Scene boundary"
                );
                ranges.push((start, i - 1, opening_score));
                start = i;
                opening_score = score;
            }
        }
        ranges.push((start, records.len() - 1, opening_score));

        ranges
            .into_iter()
            .enumerate()
            .map(|(index, (start, end, score))| self.build_scene(index as u32, start, end, score, &features))
            .collect()
    }

    fn build_scene(
        &self,
        index: u32,
        start: usize,
        end: usize,
        score: u32,
        features: &[FrameFeatures],
    ) -> Scene {
        let mut scene = Scene::new(index, start as u32, end as u32, self.config.sampling_interval);
        let span = &features[start..=end];
        scene.change_score = score;
        scene.framing = most_frequent(span.iter().map(|f| f.camera.as_deref()));
        scene.lighting = most_frequent(span.iter().map(|f| f.lighting.as_deref()));
        scene.mood = most_frequent(span.iter().map(|f| f.mood.as_deref()));
        scene.action = most_frequent(span.iter().map(|f| f.action.as_deref()));
        scene
    }
}

/// Most frequent non-empty value; ties go to the earliest.
fn most_frequent<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values.flatten() {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value.to_string())
}

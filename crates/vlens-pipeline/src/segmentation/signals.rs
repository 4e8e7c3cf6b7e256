//! Change signals between consecutive frames.
//!
//! Each signal is an independent type with a weight and a trigger. The
//! segmentation engine sums the weights of the signals that fire for a pair.

use super::features::{similar, FrameFeatures};

/// One heuristic indicator that two consecutive frames belong to different scenes.
pub trait ChangeSignal: Send + Sync {
    /// Stable name, used in logs and tests.
    fn name(&self) -> &'static str;

    /// Score contributed when the signal fires.
    fn weight(&self) -> u32;

    /// Whether the signal fires between `prev` and `curr`.
    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool;
}

/// Both values known and not similar.
fn differs(prev: Option<&str>, curr: Option<&str>) -> bool {
    match (prev, curr) {
        (Some(a), Some(b)) => !similar(a, b),
        _ => false,
    }
}

/// Setting or location change.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingChange;

impl ChangeSignal for SettingChange {
    fn name(&self) -> &'static str {
        "setting"
    }

    fn weight(&self) -> u32 {
        3
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        differs(prev.setting.as_deref(), curr.setting.as_deref())
    }
}

/// Different subjects in frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectChange;

impl ChangeSignal for SubjectChange {
    fn name(&self) -> &'static str {
        "subject"
    }

    fn weight(&self) -> u32 {
        3
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        differs(prev.subjects.as_deref(), curr.subjects.as_deref())
    }
}

/// Lighting tone or colour mode flips (dark/bright, colour/monochrome).
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualContrastChange;

impl ChangeSignal for VisualContrastChange {
    fn name(&self) -> &'static str {
        "visual_contrast"
    }

    fn weight(&self) -> u32 {
        3
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        if !(prev.analyzed && curr.analyzed) {
            return false;
        }
        let tone_flip = matches!((prev.tone, curr.tone), (Some(a), Some(b)) if a != b);
        tone_flip || prev.monochrome != curr.monochrome
    }
}

/// Shot size or camera angle change.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramingChange;

impl ChangeSignal for FramingChange {
    fn name(&self) -> &'static str {
        "framing"
    }

    fn weight(&self) -> u32 {
        2
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        match (prev.shot, curr.shot) {
            (Some(a), Some(b)) => a != b,
            _ => differs(prev.camera.as_deref(), curr.camera.as_deref()),
        }
    }
}

/// Different action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionChange;

impl ChangeSignal for ActionChange {
    fn name(&self) -> &'static str {
        "action"
    }

    fn weight(&self) -> u32 {
        2
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        differs(prev.action.as_deref(), curr.action.as_deref())
    }
}

/// On-screen text change.
///
/// Never fires while either frame carries dialogue, and progressive text
/// (one caption contained in the other) is not a change.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextChange;

impl ChangeSignal for TextChange {
    fn name(&self) -> &'static str {
        "text"
    }

    fn weight(&self) -> u32 {
        2
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        if !(prev.analyzed && curr.analyzed) || prev.has_dialogue() || curr.has_dialogue() {
            return false;
        }
        match (prev.on_screen_text.as_deref(), curr.on_screen_text.as_deref()) {
            (None, None) => false,
            (Some(a), Some(b)) => !is_progressive(a, b),
            // Text appearing or disappearing.
            _ => true,
        }
    }
}

/// One caption is a growing or shrinking version of the other.
fn is_progressive(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    let (a, b) = (norm(a), norm(b));
    a.contains(&b) || b.contains(&a)
}

/// Emotional-state or discovery keywords change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeBeatChange;

impl ChangeSignal for NarrativeBeatChange {
    fn name(&self) -> &'static str {
        "narrative_beat"
    }

    fn weight(&self) -> u32 {
        2
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        prev.analyzed && curr.analyzed && !curr.beats.is_empty() && !curr.beats.is_subset(&prev.beats)
    }
}

/// Movement change.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementChange;

impl ChangeSignal for MovementChange {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn weight(&self) -> u32 {
        1
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        differs(prev.movement.as_deref(), curr.movement.as_deref())
    }
}

/// Facial expression change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionChange;

impl ChangeSignal for ExpressionChange {
    fn name(&self) -> &'static str {
        "expression"
    }

    fn weight(&self) -> u32 {
        1
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        differs(prev.expression.as_deref(), curr.expression.as_deref())
    }
}

/// Indoor/outdoor or room-type change.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentChange;

impl ChangeSignal for EnvironmentChange {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn weight(&self) -> u32 {
        1
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        match (prev.place, curr.place) {
            (Some(a), Some(b)) if a != b => true,
            _ => differs(prev.environment.as_deref(), curr.environment.as_deref()),
        }
    }
}

/// Focal point shift.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusShift;

impl ChangeSignal for FocusShift {
    fn name(&self) -> &'static str {
        "focus"
    }

    fn weight(&self) -> u32 {
        1
    }

    fn detect(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> bool {
        differs(prev.focus.as_deref(), curr.focus.as_deref())
    }
}

/// Registered signals.
pub struct SignalSet {
    signals: Vec<Box<dyn ChangeSignal>>,
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::empty()
            .with(SettingChange)
            .with(SubjectChange)
            .with(VisualContrastChange)
            .with(FramingChange)
            .with(ActionChange)
            .with(TextChange)
            .with(NarrativeBeatChange)
            .with(MovementChange)
            .with(ExpressionChange)
            .with(EnvironmentChange)
            .with(FocusShift)
    }
}

impl SignalSet {
    pub fn empty() -> Self {
        Self { signals: Vec::new() }
    }

    pub fn with(mut self, signal: impl ChangeSignal + 'static) -> Self {
        self.signals.push(Box::new(signal));
        self
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Summed weight of the signals firing between `prev` and `curr`.
    pub fn score(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> u32 {
        self.signals
            .iter()
            .filter(|s| s.detect(prev, curr))
            .map(|s| s.weight())
            .sum()
    }

    /// Names of the signals firing between `prev` and `curr`.
    pub fn triggered(&self, prev: &FrameFeatures, curr: &FrameFeatures) -> Vec<&'static str> {
        self.signals
            .iter()
            .filter(|s| s.detect(prev, curr))
            .map(|s| s.name())
            .collect()
    }
}

impl std::fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.signals.iter().map(|s| (s.name(), s.weight())))
            .finish()
    }
}

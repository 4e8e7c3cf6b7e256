//! Scene segmentation.
//!
//! Frame descriptions are reduced to [`FrameFeatures`], consecutive pairs are
//! scored by a [`SignalSet`] of weighted [`ChangeSignal`]s, and the
//! [`SceneSegmenter`] turns scores into scene boundaries.

mod engine;
mod features;
mod signals;

pub use engine::{SceneSegmenter, SegmentationConfig};
pub use features::{similar, FrameFeatures, Place, ShotClass, Tone};
pub use signals::{
    ActionChange, ChangeSignal, EnvironmentChange, ExpressionChange, FocusShift, FramingChange,
    MovementChange, NarrativeBeatChange, SettingChange, SignalSet, SubjectChange, TextChange,
    VisualContrastChange,
};

//! Audio transcript and separated-audio judgment.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A timed transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Spoken or sung text
    pub text: String,
}

impl TranscriptSegment {
    /// True when the segment intersects `[start, end)`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && self.end > start
    }
}

/// Which audio layer carries the video's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioPriority {
    Dialogue,
    Music,
    SoundDesign,
    #[default]
    Balanced,
}

impl AudioPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioPriority::Dialogue => "dialogue",
            AudioPriority::Music => "music",
            AudioPriority::SoundDesign => "sound_design",
            AudioPriority::Balanced => "balanced",
        }
    }
}

/// Judgment of the separate audio layers.
///
/// The layers describe the same track from different angles; more than one
/// can be present at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SeparatedAudio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_design: Option<String>,
    /// Confidence in the judgment (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub priority: AudioPriority,
}

/// Transcript of the source audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AudioTranscript {
    /// Segments ordered by start time
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub separated: SeparatedAudio,
    /// True when the transcript is a fallback rather than model output
    #[serde(default)]
    pub degraded: bool,
}

impl AudioTranscript {
    /// Placeholder used when audio analysis could not run.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sort segments by start time and drop empty or inverted ones.
    pub fn normalize(&mut self) {
        self.segments
            .retain(|s| !s.text.trim().is_empty() && s.end >= s.start);
        self.segments
            .sort_by(|a, b| a.start.total_cmp(&b.start));
        self.separated.confidence = self.separated.confidence.clamp(0.0, 1.0);
    }

    /// Joined text of all segments overlapping `[start, end)`.
    pub fn text_between(&self, start: f64, end: f64) -> String {
        self.segments
            .iter()
            .filter(|s| s.overlaps(start, end))
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full transcript text.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_text_between() {
        let transcript = AudioTranscript {
            segments: vec![
                segment(0.0, 1.5, "Hello"),
                segment(1.5, 3.0, "world"),
                segment(4.0, 5.0, "later"),
            ],
            ..Default::default()
        };

        assert_eq!(transcript.text_between(1.0, 2.0), "Hello world");
        assert_eq!(transcript.text_between(3.0, 4.0), "");
        assert_eq!(transcript.text_between(3.5, 6.0), "later");
    }

    #[test]
    fn test_normalize() {
        let mut transcript = AudioTranscript {
            segments: vec![segment(2.0, 3.0, "b"), segment(0.0, 1.0, "a"), segment(5.0, 4.0, "bad"), segment(6.0, 7.0, "  ")],
            separated: SeparatedAudio {
                confidence: 1.7,
                ..Default::default()
            },
            degraded: false,
        };
        transcript.normalize();

        assert_eq!(transcript.full_text(), "a b");
        assert!((transcript.separated.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_priority_serde() {
        let json = serde_json::to_string(&AudioPriority::SoundDesign).unwrap();
        assert_eq!(json, "\"sound_design\"");
    }
}

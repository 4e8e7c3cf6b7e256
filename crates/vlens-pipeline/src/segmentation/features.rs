//! Per-frame features extracted from model descriptions.
//!
//! Labelled lines (`SETTING: ...`) are read first; keyword heuristics fill
//! the gaps when the model ignored the requested layout.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use vlens_models::FrameAnalysisRecord;

static LABELLED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\-*•]*\**[ \t]*([A-Za-z][A-Za-z /\-]{1,24}?)[ \t]*\**[ \t]*:[ \t]*\**[ \t]*(.*)$").unwrap()
});

/// Values the model uses to say a field is empty.
const EMPTY_VALUES: &[&str] = &["", "none", "n/a", "na", "no", "nothing", "-", "null", "not visible", "none visible"];

const INDOOR_WORDS: &[&str] = &[
    "indoor", "inside", "interior", "room", "kitchen", "office", "bedroom", "bathroom", "hallway",
    "studio", "classroom", "restaurant", "store", "shop", "garage", "living room",
];

const OUTDOOR_WORDS: &[&str] = &[
    "outdoor", "outside", "exterior", "street", "park", "beach", "forest", "mountain", "sky",
    "field", "garden", "road", "city", "ocean", "desert", "backyard",
];

const DARK_WORDS: &[&str] = &["dark", "night", "dim", "shadow", "low-key", "low key", "moody", "black background"];

const BRIGHT_WORDS: &[&str] = &["bright", "daylight", "sunny", "sunlit", "well-lit", "well lit", "high-key", "high key", "white background"];

const MONOCHROME_WORDS: &[&str] = &["black and white", "black-and-white", "monochrome", "grayscale", "greyscale", "sepia"];

const DIALOGUE_WORDS: &[&str] = &["speaking", "talking", "says", "saying", "narrat", "voiceover", "voice-over", "interview"];

/// Emotional-state and discovery beats, keyed by name. Each pattern must match
/// a whole word, so "danger" is not "anger" and "crystal" is not "cry".
const BEAT_WORDS: &[(&str, &str)] = &[
    ("discover", r"discover\w*"),
    ("realize", r"reali[sz](?:e|es|ed|ing|ation)"),
    ("reveal", r"reveal\w*"),
    ("notice", r"notic(?:e|es|ed|ing)"),
    ("find", r"(?:finds|finding|found)"),
    ("uncover", r"uncover\w*"),
    ("surprise", r"surpris(?:e|es|ed|ing|ingly)"),
    ("shock", r"shock(?:s|ed|ing)?"),
    ("happy", r"happ(?:y|ily|iness)"),
    ("joy", r"joy(?:ful|fully|ous)?"),
    ("sad", r"(?:sad|sadness|saddened)"),
    ("cry", r"(?:cry|cries|cried|crying)"),
    ("anger", r"(?:anger|angered|angry|angrily)"),
    ("fear", r"(?:afraid|fear|fears|feared|fearful|scared|scary)"),
    ("excite", r"excit(?:e|ed|es|ing|ement)"),
    ("confuse", r"confus(?:e|ed|es|ing|ion)"),
    ("relief", r"(?:relief|relieved)"),
    ("laugh", r"laugh(?:s|ed|ing|ter)?"),
    ("tense", r"(?:tense|tension)"),
    ("worry", r"(?:worry|worried|worries|worrying)"),
];

static BEATS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    BEAT_WORDS
        .iter()
        .map(|(name, pattern)| (*name, Regex::new(&format!(r"\b{pattern}\b")).unwrap()))
        .collect()
});

/// Dialogue values that say nobody is talking.
static SILENT_DIALOGUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:no\b|none\b|nobody\b|nothing\b|silence\b|silent\b|n/a\b)|not speaking|no one (?:is )?(?:speaking|talking)|no (?:audible )?(?:dialogue|speech)")
        .unwrap()
});

/// Shot size or camera angle class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotClass {
    ExtremeCloseUp,
    CloseUp,
    Medium,
    Wide,
    Aerial,
    Overhead,
    PointOfView,
}

impl ShotClass {
    fn classify(text: &str) -> Option<Self> {
        let t = text.to_lowercase();
        let has = |w: &str| t.contains(w);
        if has("extreme close") {
            Some(ShotClass::ExtremeCloseUp)
        } else if has("close-up") || has("close up") || has("closeup") {
            Some(ShotClass::CloseUp)
        } else if has("aerial") || has("drone") {
            Some(ShotClass::Aerial)
        } else if has("overhead") || has("top-down") || has("top down") || has("bird") {
            Some(ShotClass::Overhead)
        } else if has("pov") || has("point of view") || has("first-person") || has("first person") {
            Some(ShotClass::PointOfView)
        } else if has("wide") || has("long shot") || has("establishing") || has("full shot") {
            Some(ShotClass::Wide)
        } else if has("medium") || has("mid shot") || has("mid-shot") || has("waist") {
            Some(ShotClass::Medium)
        } else {
            None
        }
    }
}

/// Coarse lighting tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Dark,
    Bright,
}

/// Indoor / outdoor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Indoor,
    Outdoor,
}

/// Features of one frame record. Values are lowercased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameFeatures {
    pub analyzed: bool,
    pub setting: Option<String>,
    pub subjects: Option<String>,
    pub action: Option<String>,
    pub camera: Option<String>,
    pub shot: Option<ShotClass>,
    pub lighting: Option<String>,
    pub tone: Option<Tone>,
    pub monochrome: bool,
    pub movement: Option<String>,
    pub expression: Option<String>,
    pub environment: Option<String>,
    pub place: Option<Place>,
    pub focus: Option<String>,
    pub on_screen_text: Option<String>,
    pub dialogue: Option<String>,
    pub mood: Option<String>,
    pub beats: BTreeSet<&'static str>,
}

impl FrameFeatures {
    /// Features of `record`; records without content yield empty features.
    pub fn from_record(record: &FrameAnalysisRecord) -> Self {
        if !record.status.has_content() {
            return Self::default();
        }
        Self::from_description(&record.description)
    }

    pub fn from_description(description: &str) -> Self {
        let mut features = FrameFeatures {
            analyzed: true,
            ..Default::default()
        };

        let mut dialogue_labelled = false;
        for line in description.lines() {
            let Some(caps) = LABELLED_LINE.captures(line) else {
                continue;
            };
            let label = caps[1].trim().to_uppercase();
            let value = clean_value(&caps[2]);
            if dialogue_label(&label) {
                dialogue_labelled = true;
            }
            let value = if dialogue_label(&label) {
                value.filter(|v| !SILENT_DIALOGUE.is_match(v))
            } else {
                value
            };
            let slot = match label.as_str() {
                "SETTING" | "LOCATION" | "SCENE" => &mut features.setting,
                "SUBJECT" | "SUBJECTS" | "CHARACTERS" | "PEOPLE" => &mut features.subjects,
                "ACTION" | "ACTIONS" | "ACTIVITY" => &mut features.action,
                "CAMERA" | "FRAMING" | "SHOT" | "CAMERA ANGLE" => &mut features.camera,
                "LIGHTING" | "LIGHT" | "COLOR" | "COLOUR" => &mut features.lighting,
                "MOVEMENT" | "MOTION" => &mut features.movement,
                "EXPRESSION" | "EXPRESSIONS" | "FACIAL EXPRESSION" => &mut features.expression,
                "ENVIRONMENT" => &mut features.environment,
                "FOCUS" | "FOCAL POINT" => &mut features.focus,
                "TEXT" | "ON-SCREEN TEXT" | "ON SCREEN TEXT" | "CAPTION" | "CAPTIONS" => {
                    &mut features.on_screen_text
                }
                "DIALOGUE" | "SPEECH" | "NARRATION" | "AUDIO" => &mut features.dialogue,
                "MOOD" | "TONE" | "ATMOSPHERE" => &mut features.mood,
                _ => continue,
            };
            if slot.is_none() {
                *slot = value;
            }
        }

        let lower = description.to_lowercase();

        // Keyword fallbacks for fields the model left out.
        if features.camera.is_none() {
            features.shot = ShotClass::classify(&lower);
        } else {
            features.shot = features.camera.as_deref().and_then(ShotClass::classify);
        }

        let lighting_source = features.lighting.clone().unwrap_or_else(|| lower.clone());
        features.tone = tone_of(&lighting_source);
        features.monochrome = contains_any(&lower, MONOCHROME_WORDS);

        let place_source = features
            .environment
            .clone()
            .or_else(|| features.setting.clone())
            .unwrap_or_else(|| lower.clone());
        features.place = place_of(&place_source);

        if !dialogue_labelled && contains_any(&lower, DIALOGUE_WORDS) {
            features.dialogue = Some("speaking".to_string());
        }

        features.beats = BEATS
            .iter()
            .filter(|(_, re)| re.is_match(&lower))
            .map(|(name, _)| *name)
            .collect();

        features
    }

    /// Whether the frame carries active dialogue or narration.
    pub fn has_dialogue(&self) -> bool {
        self.dialogue.is_some()
    }
}

fn dialogue_label(label: &str) -> bool {
    matches!(label, "DIALOGUE" | "SPEECH" | "NARRATION" | "AUDIO")
}

fn clean_value(raw: &str) -> Option<String> {
    let value = raw
        .trim()
        .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c == '.')
        .trim()
        .to_lowercase();
    if EMPTY_VALUES.contains(&value.as_str()) {
        None
    } else {
        Some(value)
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn tone_of(text: &str) -> Option<Tone> {
    let dark = contains_any(text, DARK_WORDS);
    let bright = contains_any(text, BRIGHT_WORDS);
    match (dark, bright) {
        (true, false) => Some(Tone::Dark),
        (false, true) => Some(Tone::Bright),
        _ => None,
    }
}

fn place_of(text: &str) -> Option<Place> {
    let indoor = contains_any(text, INDOOR_WORDS);
    let outdoor = contains_any(text, OUTDOOR_WORDS);
    match (indoor, outdoor) {
        (true, false) => Some(Place::Indoor),
        (false, true) => Some(Place::Outdoor),
        _ => None,
    }
}

/// Word tokens of `text`, ignoring short filler words.
pub fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .filter(|w| !matches!(*w, "the" | "and" | "with" | "her" | "his" | "its" | "their" | "from" | "into"))
        .map(|w| w.to_string())
        .collect()
}

/// Loose equality for free-text values: containment or word overlap.
pub fn similar(a: &str, b: &str) -> bool {
    if a == b || a.contains(b) || b.contains(a) {
        return true;
    }
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() || tb.is_empty() {
        return false;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    shared * 2 >= union
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlens_models::{Frame, RecordStatus};

    const KITCHEN: &str = "SETTING: Modern kitchen\nSUBJECTS: A woman in an apron\nACTION: Chopping onions\nCAMERA: Medium shot\nLIGHTING: Bright daylight\nTEXT: none\nDIALOGUE: none\nMOOD: Calm";

    #[test]
    fn test_labelled_lines() {
        let f = FrameFeatures::from_description(KITCHEN);
        assert!(f.analyzed);
        assert_eq!(f.setting.as_deref(), Some("modern kitchen"));
        assert_eq!(f.action.as_deref(), Some("chopping onions"));
        assert_eq!(f.shot, Some(ShotClass::Medium));
        assert_eq!(f.tone, Some(Tone::Bright));
        assert_eq!(f.place, Some(Place::Indoor));
        assert_eq!(f.on_screen_text, None);
        assert!(!f.has_dialogue());
    }

    #[test]
    fn test_markdown_labels() {
        let f = FrameFeatures::from_description("- **Setting:** city street at night\n- **Text:** \"SALE\"");
        assert_eq!(f.setting.as_deref(), Some("city street at night"));
        assert_eq!(f.on_screen_text.as_deref(), Some("sale"));
        assert_eq!(f.place, Some(Place::Outdoor));
    }

    #[test]
    fn test_keyword_fallbacks() {
        let f = FrameFeatures::from_description(
            "A black and white close-up of a man talking to the camera; he suddenly realizes something.",
        );
        assert_eq!(f.shot, Some(ShotClass::CloseUp));
        assert!(f.monochrome);
        assert!(f.has_dialogue());
        assert!(f.beats.contains("realize"));
    }

    #[test]
    fn test_non_analyzed_record_has_empty_features() {
        let frame = Frame::new(0, 0.5, "f.jpg");
        let record = FrameAnalysisRecord::failed(&frame, "SETTING: should be ignored");
        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(FrameFeatures::from_record(&record), FrameFeatures::default());
    }

    #[test]
    fn test_similar() {
        assert!(similar("modern kitchen", "kitchen"));
        assert!(similar("woman chopping onions", "woman chopping red onions"));
        assert!(!similar("modern kitchen", "busy city street"));
    }

    #[test]
    fn test_hyphenated_label() {
        let f = FrameFeatures::from_description("On-screen text: SALE\nFocal point: the price tag");
        assert_eq!(f.on_screen_text.as_deref(), Some("sale"));
        assert_eq!(f.focus.as_deref(), Some("the price tag"));
    }

    #[test]
    fn test_negative_dialogue_is_empty() {
        for value in ["No one is speaking", "No dialogue", "None.", "Nobody talks", "The chef is not speaking", "no audible speech"] {
            let f = FrameFeatures::from_description(&format!("SETTING: kitchen\nDIALOGUE: {value}"));
            assert!(!f.has_dialogue(), "{value:?} counted as dialogue");
        }
        let f = FrameFeatures::from_description("DIALOGUE: The host says hello");
        assert_eq!(f.dialogue.as_deref(), Some("the host says hello"));
        let f = FrameFeatures::from_description("DIALOGUE: Nora explains the recipe");
        assert!(f.has_dialogue());
    }

    #[test]
    fn test_beats_match_whole_words() {
        for text in [
            "A danger sign on a fence",
            "Intense traffic on the highway",
            "Kids enjoy the crystal clear lake",
            "A realistic painting in a gallery",
        ] {
            let f = FrameFeatures::from_description(text);
            assert!(f.beats.is_empty(), "{text:?} produced beats {:?}", f.beats);
        }

        let f = FrameFeatures::from_description("She cries, angry and tense, then discovers the letter");
        let beats: Vec<_> = f.beats.iter().copied().collect();
        assert_eq!(beats, vec!["anger", "cry", "discover", "tense"]);
    }
}

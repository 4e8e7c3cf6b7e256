//! Prompt builders for every inference call of the pipeline.

use vlens_models::{
    AudioTranscript, CategoryAnalysis, Frame, Hook, NarrativeAnalysis, Scene, VideoCategory,
};

/// Labelled lines requested for every frame, in order.
pub const FRAME_LABELS: &[&str] = &[
    "SETTING",
    "SUBJECTS",
    "ACTION",
    "CAMERA",
    "LIGHTING",
    "MOVEMENT",
    "EXPRESSION",
    "ENVIRONMENT",
    "FOCUS",
    "TEXT",
    "DIALOGUE",
    "MOOD",
    "CONTEXT",
];

/// Longest transcript excerpt embedded in a synthesis prompt.
const MAX_TRANSCRIPT_CHARS: usize = 6000;

/// Build the prompt for one batch of frames.
///
/// The images follow the prompt in the same order as `frames`.
pub fn frame_batch_prompt(frames: &[Frame]) -> String {
    let mut prompt = format!(
        "You are a film analyst. You are given {} consecutive frames sampled from one video, in order.\n\n",
        frames.len()
    );

    prompt.push_str("FRAMES:\n");
    for (i, frame) in frames.iter().enumerate() {
        prompt.push_str(&format!("- FRAME {}: t={:.2}s\n", i + 1, frame.timestamp));
    }

    prompt.push_str(
        r#"
Describe EACH frame separately. For every frame write a block that starts with
"FRAME n:" (n is the frame's number above) followed by these labelled lines:

SETTING: where the frame takes place
SUBJECTS: people, animals or objects in focus
ACTION: what is happening
CAMERA: shot size and camera angle (e.g. close-up, medium shot, wide shot, aerial)
LIGHTING: lighting and colour (e.g. bright daylight, dark, black and white)
MOVEMENT: camera or subject motion
EXPRESSION: facial expressions, or "none"
ENVIRONMENT: indoor or outdoor, and the kind of place
FOCUS: the focal point of the frame
TEXT: any on-screen text, verbatim, or "none"
DIALOGUE: whether someone appears to be speaking or narrating, or "none"
MOOD: the emotional tone
CONTEXT: one sentence on what this frame contributes to the video

IMPORTANT: Write exactly one block per frame, in order. Do not merge frames.
If you cannot describe a particular frame, say so inside that frame's block only."#,
    );

    prompt
}

/// Build the prompt for transcript and audio-layer analysis.
pub fn audio_prompt(duration: f64) -> String {
    format!(
        r#"You are an audio analyst. The attached audio track is {:.1} seconds long.

1. Transcribe all speech and sung lyrics with timestamps in seconds.
2. Judge the separate audio layers: dialogue, music/lyrics and sound design.
   Describe each layer that is present; omit layers that are absent.
3. Decide which layer carries the message: "dialogue", "music", "sound_design" or "balanced".

Return ONLY a single JSON object with this schema:
{{
  "segments": [
    {{ "start": 0.0, "end": 2.5, "text": "Spoken text" }}
  ],
  "separated": {{
    "dialogue": "Who speaks and about what",
    "music_lyrics": "Music style and lyrics",
    "sound_design": "Effects and ambience",
    "confidence": 0.8,
    "priority": "dialogue"
  }}
}}"#,
        duration
    )
}

/// Build the category classification prompt.
pub fn category_prompt(scenes: &[Scene], transcript: &AudioTranscript) -> String {
    let categories = VideoCategory::ALL
        .iter()
        .map(VideoCategory::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::from("You are a video strategist. Classify the video described below.\n\n");
    push_context(&mut prompt, scenes, transcript);
    prompt.push_str(&format!(
        r#"
Choose exactly one category from: {}

Return ONLY a single JSON object with this schema:
{{
  "category": "tutorial",
  "confidence": 0.0,
  "rationale": "Why this category fits"
}}"#,
        categories
    ));
    prompt
}

/// Build the hook extraction prompt.
pub fn hooks_prompt(scenes: &[Scene], transcript: &AudioTranscript, duration: f64) -> String {
    let mut prompt = format!(
        "You are a short-form video expert. Identify the engagement hooks in this {:.1} second video.\n\n",
        duration
    );
    push_context(&mut prompt, scenes, transcript);
    prompt.push_str(
        r#"
A hook is any moment designed to capture or hold attention: a striking visual, a sound cue,
on-screen text, a question, a pattern interrupt, an emotional beat or a curiosity gap.
Anchor each hook to the exact second it happens; hooks do not need to align with scenes.

Return ONLY a single JSON object with this schema:
{
  "hooks": [
    {
      "timestamp": 0.0,
      "type": "visual | audio | text | question | pattern_interrupt | emotional | curiosity | other",
      "description": "What happens and why it grabs attention",
      "impact": "low | medium | high"
    }
  ]
}"#,
    );
    prompt
}

/// Build the contextual analysis prompt for a group of scenes.
pub fn scene_context_prompt(scenes: &[Scene]) -> String {
    let mut prompt = String::from(
        "You are a film analyst. For each scene below, explain its intent, how it is executed and its impact on the viewer.\n\n",
    );
    prompt.push_str(&scene_digest(scenes));
    prompt.push_str(
        r#"
Return ONLY a single JSON object with this schema:
{
  "scenes": [
    {
      "scene": 0,
      "intent": "What the scene is trying to achieve",
      "execution": "How shots, sound and pacing deliver it",
      "impact": "The effect on the viewer"
    }
  ]
}
Use the scene numbers given above."#,
    );
    prompt
}

/// Build the narrative analysis prompt.
pub fn narrative_prompt(scenes: &[Scene], transcript: &AudioTranscript) -> String {
    let mut prompt = String::from("You are a story analyst. Read the scene breakdown of a video below.\n\n");
    push_context(&mut prompt, scenes, transcript);
    prompt.push_str(
        r#"
Describe the video's overall intent, its narrative structure and the core message.

Return ONLY a single JSON object with this schema:
{
  "intent": "What the creator wants the viewer to do or feel",
  "structure": "How the video is built from beginning to end",
  "message": "The core takeaway"
}"#,
    );
    prompt
}

/// Build the strategic summary prompt from the other derivations.
pub fn summary_prompt(
    category: &CategoryAnalysis,
    hooks: &[Hook],
    narrative: &NarrativeAnalysis,
    scenes: &[Scene],
) -> String {
    let mut prompt = String::from(
        "You are a creative director reviewing a video. Synthesize the analysis below into a strategic summary.\n\n",
    );

    prompt.push_str(&format!(
        "CATEGORY: {} (confidence {:.2})\n{}\n\n",
        category.category.as_str(),
        category.confidence,
        category.rationale
    ));

    prompt.push_str("HOOKS:\n");
    if hooks.is_empty() {
        prompt.push_str("- none identified\n");
    }
    for hook in hooks {
        prompt.push_str(&format!(
            "- {:.1}s [{:?}, {:?}] {}\n",
            hook.timestamp, hook.hook_type, hook.impact, hook.description
        ));
    }

    prompt.push_str(&format!(
        "\nNARRATIVE:\nIntent: {}\nStructure: {}\nMessage: {}\n\n",
        narrative.intent, narrative.structure, narrative.message
    ));

    prompt.push_str(&format!("The video has {} scenes.\n", scenes.len()));
    prompt.push_str(
        r#"
Return ONLY a single JSON object with this schema:
{
  "summary": "Two or three sentences",
  "strengths": ["..."],
  "weaknesses": ["..."],
  "recommendations": ["..."],
  "target_audience": "Who this video is for"
}"#,
    );
    prompt
}

/// One line block per scene with timing, features and audio.
pub fn scene_digest(scenes: &[Scene]) -> String {
    let mut digest = String::from("SCENES:\n");
    for scene in scenes {
        digest.push_str(&format!(
            "- Scene {} ({:.1}s - {:.1}s)",
            scene.index, scene.start_time, scene.end_time
        ));
        for (label, value) in [
            ("action", &scene.action),
            ("framing", &scene.framing),
            ("lighting", &scene.lighting),
            ("mood", &scene.mood),
        ] {
            if let Some(value) = value {
                digest.push_str(&format!("; {}: {}", label, value));
            }
        }
        if !scene.audio_context.is_empty() {
            digest.push_str(&format!("; audio: \"{}\"", scene.audio_context));
        }
        digest.push('\n');
    }
    digest
}

fn push_context(prompt: &mut String, scenes: &[Scene], transcript: &AudioTranscript) {
    prompt.push_str(&scene_digest(scenes));

    let text = transcript.full_text();
    if !text.is_empty() {
        prompt.push_str("\nTRANSCRIPT:\n");
        prompt.push_str(truncate_chars(&text, MAX_TRANSCRIPT_CHARS));
        prompt.push('\n');
    }

    let separated = &transcript.separated;
    if separated.dialogue.is_some() || separated.music_lyrics.is_some() || separated.sound_design.is_some() {
        prompt.push_str(&format!("\nAUDIO PRIORITY: {}\n", separated.priority.as_str()));
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlens_models::TranscriptSegment;

    #[test]
    fn test_frame_batch_prompt_numbers_frames() {
        let frames: Vec<Frame> = (3..6).map(|i| Frame::new(i, 0.5, "f.jpg")).collect();
        let prompt = frame_batch_prompt(&frames);
        assert!(prompt.contains("3 consecutive frames"));
        assert!(prompt.contains("FRAME 1: t=1.50s"));
        assert!(prompt.contains("FRAME 3: t=2.50s"));
        for label in FRAME_LABELS {
            assert!(prompt.contains(&format!("{label}:")), "missing {label}");
        }
    }

    #[test]
    fn test_scene_digest_includes_audio() {
        let mut scene = Scene::new(0, 0, 3, 0.5);
        scene.action = Some("cooking".to_string());
        scene.audio_context = "hello there".to_string();
        let digest = scene_digest(&[scene]);
        assert!(digest.contains("Scene 0 (0.0s - 2.0s)"));
        assert!(digest.contains("action: cooking"));
        assert!(digest.contains("audio: \"hello there\""));
    }

    #[test]
    fn test_category_prompt_lists_taxonomy() {
        let prompt = category_prompt(&[], &AudioTranscript::default());
        assert!(prompt.contains("product_review"));
        assert!(prompt.contains("\"confidence\": 0.0"));
    }

    #[test]
    fn test_transcript_is_truncated() {
        let transcript = AudioTranscript {
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 1.0,
                text: "é".repeat(MAX_TRANSCRIPT_CHARS + 50),
            }],
            ..Default::default()
        };
        let prompt = narrative_prompt(&[], &transcript);
        assert_eq!(prompt.matches('é').count(), MAX_TRANSCRIPT_CHARS);
    }
}

//! Request and outcome types for inference calls.

use serde::{Deserialize, Serialize};

/// One part of a multimodal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Image { mime: String, bytes: Vec<u8> },
    Audio { mime: String, bytes: Vec<u8> },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Payload::Image {
            mime: "image/jpeg".to_string(),
            bytes,
        }
    }

    pub fn mp3(bytes: Vec<u8>) -> Self {
        Payload::Audio {
            mime: "audio/mp3".to_string(),
            bytes,
        }
    }

    pub fn is_binary(&self) -> bool {
        !matches!(self, Payload::Text(_))
    }
}

/// Model tier; each tier maps to a configured model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Fast,
    #[default]
    Standard,
    Pro,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Standard => "standard",
            ModelTier::Pro => "pro",
        }
    }
}

/// Expected response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Admission lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lane {
    /// Single-flight with minimum spacing between admissions.
    #[default]
    Serialized,
    /// Shared pool of parallel slots.
    Parallel,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Serialized => "serialized",
            Lane::Parallel => "parallel",
        }
    }
}

/// Portion of a response inspected for refusal phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefusalScope {
    /// A refusal phrase anywhere declines the call.
    #[default]
    WholeResponse,
    /// Only the first `n` characters are inspected.
    Preamble(usize),
    /// Text is never inspected; safety blocks still count.
    Disabled,
}

/// A logical inference call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub label: String,
    pub parts: Vec<Payload>,
    pub tier: ModelTier,
    pub max_output_tokens: u32,
    pub response_format: ResponseFormat,
    pub lane: Lane,
    pub refusal_scope: RefusalScope,
}

impl InferenceRequest {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parts: Vec::new(),
            tier: ModelTier::default(),
            max_output_tokens: 2048,
            response_format: ResponseFormat::default(),
            lane: Lane::default(),
            refusal_scope: RefusalScope::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Payload::text(text));
        self
    }

    pub fn with_part(mut self, part: Payload) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = lane;
        self
    }

    pub fn with_refusal_scope(mut self, scope: RefusalScope) -> Self {
        self.refusal_scope = scope;
        self
    }
}

/// Successful reply.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReply {
    pub text: String,
    pub model: String,
    pub attempts: u32,
}

/// The model declined on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Declined {
    pub reason: String,
    pub attempts: u32,
}

/// Result of a logical call that did not fail at the transport level.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    Completed(InferenceReply),
    Declined(Declined),
}

impl InferenceOutcome {
    pub fn is_declined(&self) -> bool {
        matches!(self, InferenceOutcome::Declined(_))
    }

    pub fn attempts(&self) -> u32 {
        match self {
            InferenceOutcome::Completed(reply) => reply.attempts,
            InferenceOutcome::Declined(declined) => declined.attempts,
        }
    }

    /// Reply text, if the call completed.
    pub fn text(&self) -> Option<&str> {
        match self {
            InferenceOutcome::Completed(reply) => Some(&reply.text),
            InferenceOutcome::Declined(_) => None,
        }
    }
}

//! Engagement hooks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of engagement element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    Visual,
    Audio,
    Text,
    Question,
    PatternInterrupt,
    Emotional,
    Curiosity,
    #[serde(other)]
    Other,
}

/// Impact rating of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    #[default]
    Medium,
    High,
}

/// A timestamp-anchored engagement element.
///
/// Hooks are not aligned to scene boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Hook {
    /// Position in the video (seconds)
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub hook_type: HookType,
    pub description: String,
    #[serde(default)]
    pub impact: Impact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_deserialize_unknown_type() {
        let hook: Hook = serde_json::from_str(
            r#"{"timestamp": 1.5, "type": "jump_scare", "description": "loud bang", "impact": "high"}"#,
        )
        .unwrap();
        assert_eq!(hook.hook_type, HookType::Other);
        assert_eq!(hook.impact, Impact::High);
    }

    #[test]
    fn test_hook_default_impact() {
        let hook: Hook =
            serde_json::from_str(r#"{"timestamp": 0, "type": "question", "description": "why?"}"#).unwrap();
        assert_eq!(hook.impact, Impact::Medium);
    }
}

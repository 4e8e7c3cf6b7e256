//! Refusal phrase detection.

use crate::request::RefusalScope;

/// Phrases a model uses when it will not analyze content.
///
/// Matched against lowercased text with typographic apostrophes folded.
const REFUSAL_PHRASES: &[&str] = &[
    "unable to analyze",
    "unable to analyse",
    "unable to provide",
    "unable to describe",
    "unable to assist",
    "unable to help with",
    "i can't provide",
    "i cannot provide",
    "i can't analyze",
    "i cannot analyze",
    "i can't describe",
    "i cannot describe",
    "i can't help with",
    "i cannot help with",
    "i can't assist",
    "i cannot assist",
    "i'm not able to",
    "i am not able to",
    "i won't be able to",
    "i'm sorry, but i can",
    "i apologize, but i can",
    "cannot fulfill this request",
    "can't fulfill this request",
    "not able to process this",
    "against my safety guidelines",
    "violates my content policy",
];

/// Classifies response text as a refusal.
#[derive(Debug, Clone)]
pub struct RefusalDetector {
    phrases: Vec<String>,
}

impl Default for RefusalDetector {
    fn default() -> Self {
        Self {
            phrases: REFUSAL_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl RefusalDetector {
    /// Detector with a custom phrase list.
    pub fn with_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases.into_iter().map(|p| normalize(p.as_ref())).collect(),
        }
    }

    /// Return the matched phrase when `text` reads as a refusal within `scope`.
    pub fn detect(&self, text: &str, scope: RefusalScope) -> Option<String> {
        let inspected: String = match scope {
            RefusalScope::Disabled => return None,
            RefusalScope::WholeResponse => text.to_string(),
            RefusalScope::Preamble(n) => text.chars().take(n).collect(),
        };
        let haystack = normalize(&inspected);

        self.phrases
            .iter()
            .find(|phrase| haystack.contains(phrase.as_str()))
            .cloned()
    }

    /// Shorthand for [`detect`](Self::detect) over the whole text.
    pub fn is_refusal(&self, text: &str) -> bool {
        self.detect(text, RefusalScope::WholeResponse).is_some()
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}', '`'], "'")
}

//! Parsing of free-text and JSON model responses.
//!
//! Multi-frame replies are split with layered strategies, tried in order
//! until one yields exactly one chunk per frame:
//! 1. `FRAME n:` markers (placed by their number)
//! 2. Numbered list items
//! 3. Blank-line separated paragraphs
//! 4. The whole reply as the first frame
//!
//! When no layer matches the batch size, the first layer that produced
//! anything is used: extra chunks are dropped and missing slots are filled
//! from the nearest available chunk. Filled slots are flagged so records
//! can be marked as filler rather than genuine analysis.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{PipelineError, PipelineResult};

static FRAME_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t>*#_]*frame[ \t]*#?[ \t]*(\d+)[ \t*_]*[:.)\-]*[ \t*_]*").unwrap()
});

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(\d+)[.)][ \t]+").unwrap());

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Which layer produced the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    FrameMarkers,
    NumberedList,
    Paragraphs,
    WholeResponse,
}

impl ParseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStrategy::FrameMarkers => "frame_markers",
            ParseStrategy::NumberedList => "numbered_list",
            ParseStrategy::Paragraphs => "paragraphs",
            ParseStrategy::WholeResponse => "whole_response",
        }
    }
}

/// Text assigned to one frame slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSlot {
    pub text: String,
    /// Copied from a neighbouring slot
    pub filler: bool,
}

/// A multi-frame reply split into one slot per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBatch {
    pub slots: Vec<ParsedSlot>,
    pub strategy: ParseStrategy,
    /// True when the chosen layer matched the batch size exactly
    pub exact: bool,
}

impl ParsedBatch {
    pub fn filler_count(&self) -> usize {
        self.slots.iter().filter(|s| s.filler).count()
    }
}

/// Split a multi-frame reply into `expected` slots.
pub fn parse_frame_batch(text: &str, expected: usize) -> PipelineResult<ParsedBatch> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PipelineError::parse_failure("empty response"));
    }
    if expected == 0 {
        return Ok(ParsedBatch {
            slots: Vec::new(),
            strategy: ParseStrategy::WholeResponse,
            exact: true,
        });
    }

    let layers = [
        (ParseStrategy::FrameMarkers, split_frame_markers(text, expected)),
        (ParseStrategy::NumberedList, sequential(split_numbered(text), expected)),
        (ParseStrategy::Paragraphs, sequential(split_paragraphs(text), expected)),
    ];

    if let Some((strategy, split)) = layers.iter().find(|(_, split)| split.is_exact(expected)) {
        return Ok(split.clone().into_batch(*strategy, true));
    }

    let (strategy, split) = layers
        .into_iter()
        .find(|(_, split)| split.found > 0)
        .unwrap_or_else(|| {
            (
                ParseStrategy::WholeResponse,
                sequential(vec![text.to_string()], expected),
            )
        });

    if split.placed() == 0 {
        return Err(PipelineError::parse_failure("no frame content found"));
    }
    Ok(split.into_batch(strategy, false))
}

/// Chunks placed into slots by one layer.
#[derive(Debug, Clone)]
struct Split {
    slots: Vec<Option<String>>,
    /// Chunks the layer recognised, before placement
    found: usize,
}

impl Split {
    fn placed(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn is_exact(&self, expected: usize) -> bool {
        self.found == expected && self.placed() == expected
    }

    fn into_batch(self, strategy: ParseStrategy, exact: bool) -> ParsedBatch {
        let filled = fill_nearest(&self.slots);
        ParsedBatch {
            slots: filled,
            strategy,
            exact,
        }
    }
}

fn sequential(chunks: Vec<String>, expected: usize) -> Split {
    let found = chunks.len();
    let mut slots = vec![None; expected];
    for (slot, chunk) in slots.iter_mut().zip(chunks) {
        *slot = Some(chunk);
    }
    Split { slots, found }
}

/// Layer 1: `FRAME n:` blocks, placed by number when the numbers fit.
fn split_frame_markers(text: &str, expected: usize) -> Split {
    let markers: Vec<(usize, usize, Option<usize>)> = FRAME_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
            Some((whole.start(), whole.end(), number))
        })
        .collect();

    let chunks: Vec<(Option<usize>, String)> = markers
        .iter()
        .enumerate()
        .map(|(i, (_, body_start, number))| {
            let body_end = markers.get(i + 1).map(|m| m.0).unwrap_or(text.len());
            (*number, text[*body_start..body_end].trim().to_string())
        })
        .filter(|(_, body)| !body.is_empty())
        .collect();

    let numbers: Vec<usize> = chunks.iter().filter_map(|(n, _)| *n).collect();
    let mut unique = numbers.clone();
    unique.sort_unstable();
    unique.dedup();
    let by_number = numbers.len() == chunks.len()
        && unique.len() == numbers.len()
        && numbers.iter().all(|n| (1..=expected).contains(n));

    if !by_number {
        return sequential(chunks.into_iter().map(|(_, body)| body).collect(), expected);
    }

    let found = chunks.len();
    let mut slots = vec![None; expected];
    for (number, body) in chunks {
        if let Some(n) = number {
            slots[n - 1] = Some(body);
        }
    }
    Split { slots, found }
}

/// Layer 2: `1.` / `1)` list items. Needs at least two items.
fn split_numbered(text: &str) -> Vec<String> {
    let starts: Vec<(usize, usize)> = NUMBERED_ITEM
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    if starts.len() < 2 {
        return Vec::new();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, (_, body_start))| {
            let body_end = starts.get(i + 1).map(|s| s.0).unwrap_or(text.len());
            text[*body_start..body_end].trim().to_string()
        })
        .filter(|body| !body.is_empty())
        .collect()
}

/// Layer 3: blank-line separated paragraphs. Needs at least two.
fn split_paragraphs(text: &str) -> Vec<String> {
    let paragraphs: Vec<String> = PARAGRAPH_BREAK
        .split(text)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.len() < 2 {
        return Vec::new();
    }
    paragraphs
}

/// Fill empty slots from the nearest filled one, preferring the earlier
/// neighbour on ties.
fn fill_nearest(slots: &[Option<String>]) -> Vec<ParsedSlot> {
    (0..slots.len())
        .map(|i| match &slots[i] {
            Some(text) => ParsedSlot {
                text: text.clone(),
                filler: false,
            },
            None => {
                let nearest = (1..slots.len()).find_map(|d| {
                    let before = i.checked_sub(d).and_then(|j| slots[j].as_ref());
                    let after = slots.get(i + d).and_then(|s| s.as_ref());
                    before.or(after)
                });
                ParsedSlot {
                    text: nearest.cloned().unwrap_or_default(),
                    filler: true,
                }
            }
        })
        .collect()
}

/// Strip a surrounding markdown code fence.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Parse a JSON reply, tolerating code fences and surrounding prose.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> PipelineResult<T> {
    let body = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }

    // Fall back to the outermost object or array embedded in prose.
    let candidates = [('{', '}'), ('[', ']')];
    for (open, close) in candidates {
        if let (Some(start), Some(end)) = (body.find(open), body.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&body[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(PipelineError::parse_failure(format!(
        "no JSON value in response: {}",
        body.chars().take(120).collect::<String>()
    )))
}

// src/extract/locate.rs
//! Locating the JSON array inside free-form model output.
//!
//! Scans run in order, each one a fallback for the previous:
//! 1) a fenced block tagged `json` (lowercase tag only)
//! 2) the first `[` whose next non-whitespace char is `{`, up to the last `]`
//! 3) the first `[` up to the last `]`
//! 4) the trimmed raw text itself
//!
//! Known limitation: the closing bound is always the last `]` in the text, so trailing
//! citation markers after the real array (e.g. `... }] see [2]`) widen the candidate and
//! make it undecodable.

use once_cell::sync::OnceCell;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Fenced,
    BracketPair,
    Naive,
    Raw,
}

impl PayloadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadSource::Fenced => "fenced",
            PayloadSource::BracketPair => "bracket_pair",
            PayloadSource::Naive => "naive",
            PayloadSource::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub text: &'a str,
    pub source: PayloadSource,
}

pub fn locate(raw: &str) -> Candidate<'_> {
    if let Some(inner) = fenced_block(raw) {
        return Candidate {
            text: inner,
            source: PayloadSource::Fenced,
        };
    }
    if let Some((start, end)) = bracket_pair(raw) {
        return Candidate {
            text: &raw[start..=end],
            source: PayloadSource::BracketPair,
        };
    }
    if let Some((start, end)) = naive_bounds(raw) {
        return Candidate {
            text: &raw[start..=end],
            source: PayloadSource::Naive,
        };
    }
    Candidate {
        text: raw.trim(),
        source: PayloadSource::Raw,
    }
}

/// Inner text of the first ```` ```json ```` block, surrounding whitespace excluded.
pub fn fenced_block(raw: &str) -> Option<&str> {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("static fence regex")
    });
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Byte bounds (inclusive) of an array-of-objects: the first `[` followed by `{`
/// (ignoring whitespace), paired with the last `]`. Citation markers like `[1]` never
/// qualify as the opener.
pub fn bracket_pair(raw: &str) -> Option<(usize, usize)> {
    let end = raw.rfind(']')?;
    let start = raw.match_indices('[').map(|(i, _)| i).find(|&i| {
        raw[i + 1..]
            .chars()
            .find(|c| !c.is_whitespace())
            .is_some_and(|c| c == '{')
    })?;
    (end > start).then_some((start, end))
}

/// Byte bounds (inclusive) of the first `[` and the last `]`.
pub fn naive_bounds(raw: &str) -> Option<(usize, usize)> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then_some((start, end))
}

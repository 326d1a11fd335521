//! Measurements derived from content.

use std::collections::HashSet;

use serde_json::Value;

use super::patterns::{CONFIDENCE_MARKER, REFERENCE_MARKER, URL_PATTERN};
use crate::types::Content;

/// Whitespace-delimited tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Distinct citation-like references: `[n]` markers and bare URLs.
pub fn count_sources(text: &str) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();

    for m in REFERENCE_MARKER.find_iter(text) {
        seen.insert(m.as_str());
    }
    for m in URL_PATTERN.find_iter(text) {
        seen.insert(m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']));
    }

    seen.len()
}

/// Confidence from an explicit marker. A trailing `%` divides by 100; the
/// result is clamped to [0, 1].
pub fn extract_confidence(content: &Content) -> Option<f64> {
    match content {
        Content::Mapping(map) => ["confidence", "confidence_score"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|value| match value {
                Value::Number(n) => n.as_f64().and_then(|v| normalize(v, false)),
                Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok().and_then(
                    |v| normalize(v, s.trim_end().ends_with('%')),
                ),
                _ => None,
            }),
        Content::Text(text) => {
            let caps = CONFIDENCE_MARKER.captures(text)?;
            let value: f64 = caps[1].parse().ok()?;
            normalize(value, caps.get(2).is_some())
        }
        Content::Sequence(_) => None,
    }
}

fn normalize(value: f64, percent: bool) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let value = if percent { value / 100.0 } else { value };
    Some(value.clamp(0.0, 1.0))
}

//! Output type classification.
//!
//! A fixed cascade, first match wins: structured JSON, then markdown, then
//! HTML, then CSV, then plain text.

use serde_json::Value;

use super::patterns;
use super::RawOutput;
use crate::types::{Content, OutputType};

/// Classify raw input and produce the content it normalizes to.
///
/// Null input classifies as empty text; callers decide how to treat blanks.
pub fn classify(raw: RawOutput) -> (OutputType, Content) {
    match raw {
        RawOutput::Null => (OutputType::Text, Content::empty()),
        RawOutput::Mapping(map) => (OutputType::Json, Content::Mapping(map)),
        RawOutput::Sequence(items) => (OutputType::Json, Content::Sequence(items)),
        RawOutput::Text(text) => classify_text(text),
    }
}

fn classify_text(text: String) -> (OutputType, Content) {
    if let Some(content) = parse_structured(&text) {
        return (OutputType::Json, content);
    }

    let output_type = if looks_like_markdown(&text) {
        OutputType::Markdown
    } else if looks_like_html(&text) {
        OutputType::Html
    } else if looks_like_csv(&text) {
        OutputType::Csv
    } else {
        OutputType::Text
    };

    (output_type, Content::Text(text))
}

/// Strictly parse text as a JSON object or array.
pub fn parse_structured(text: &str) -> Option<Content> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(Content::Mapping(map)),
        Ok(Value::Array(items)) => Some(Content::Sequence(items)),
        _ => None,
    }
}

/// Heading, list marker or code fence.
pub fn looks_like_markdown(text: &str) -> bool {
    patterns::contains_heading(text)
        || patterns::contains_list_item(text)
        || patterns::contains_fence(text)
}

/// An opening tag with a matching closing tag.
pub fn looks_like_html(text: &str) -> bool {
    patterns::contains_balanced_tag(text)
}

/// Two or more non-empty lines with the same positive comma count.
pub fn looks_like_csv(text: &str) -> bool {
    patterns::is_delimited_table(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify_str(text: &str) -> OutputType {
        classify(RawOutput::from(text)).0
    }

    #[test]
    fn test_json_object_text() {
        let (ty, content) = classify(RawOutput::from(r#"  {"summary": "ok", "score": 3} "#));
        assert_eq!(ty, OutputType::Json);
        assert!(matches!(content, Content::Mapping(ref m) if m.len() == 2));
    }

    #[test]
    fn test_json_array_text() {
        let (ty, content) = classify(RawOutput::from("[1, 2, 3]"));
        assert_eq!(ty, OutputType::Json);
        assert_eq!(content, Content::Sequence(vec![json!(1), json!(2), json!(3)]));
    }

    #[test]
    fn test_scalar_json_is_text() {
        assert_eq!(classify_str("42"), OutputType::Text);
        assert_eq!(classify_str("\"quoted\""), OutputType::Text);
    }

    #[test]
    fn test_malformed_json_falls_through() {
        assert_eq!(classify_str("{not json at all}"), OutputType::Text);
    }

    #[test]
    fn test_raw_structures_are_json() {
        let (ty, _) = classify(RawOutput::from(json!({"a": 1})));
        assert_eq!(ty, OutputType::Json);
        let (ty, _) = classify(RawOutput::from(json!([])));
        assert_eq!(ty, OutputType::Json);
    }

    #[test]
    fn test_markdown_variants() {
        assert_eq!(classify_str("# Report\n\nBody"), OutputType::Markdown);
        assert_eq!(classify_str("Items:\n- one\n- two"), OutputType::Markdown);
        assert_eq!(classify_str("1. first\n2. second"), OutputType::Markdown);
        assert_eq!(classify_str("```\ncode\n```"), OutputType::Markdown);
    }

    #[test]
    fn test_markdown_wins_over_html() {
        assert_eq!(classify_str("# Title\n<p>para</p>"), OutputType::Markdown);
    }

    #[test]
    fn test_html() {
        assert_eq!(classify_str("<div><p>Hello</p></div>"), OutputType::Html);
        assert_eq!(classify_str("x < y > z"), OutputType::Text);
    }

    #[test]
    fn test_csv() {
        assert_eq!(classify_str("name,score\nalpha,1\nbeta,2"), OutputType::Csv);
        assert_eq!(classify_str("Hello, world"), OutputType::Text);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(classify_str("Just a sentence."), OutputType::Text);
    }
}

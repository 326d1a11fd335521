//! Section extraction.

use serde_json::{Map, Value};

use super::patterns::{FENCE_PATTERN, HEADING_LINE};
use crate::types::{Content, OutputType, Sections};

/// Section title used for single-section outputs.
pub const CONTENT_SECTION: &str = "content";

/// Section title used for markdown text before the first heading.
pub const INTRODUCTION_SECTION: &str = "introduction";

/// Extract sections according to the output type.
pub fn extract_sections(output_type: OutputType, content: &Content) -> Sections {
    match (output_type, content) {
        (_, Content::Mapping(map)) => mapping_sections(map),
        (_, Content::Sequence(_)) => Sections::new(),
        (OutputType::Markdown, Content::Text(text)) => markdown_sections(text),
        (_, Content::Text(text)) => single_section(text),
    }
}

/// Split markdown on ATX headings, ignoring headings inside code fences.
pub fn markdown_sections(text: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if FENCE_PATTERN.is_match(line) {
            in_fence = !in_fence;
            body.push(line);
            continue;
        }

        if !in_fence {
            if let Some(caps) = HEADING_LINE.captures(line) {
                flush(&mut sections, current.take(), &body);
                body.clear();
                current = Some(caps[2].trim().to_string());
                continue;
            }
        }

        body.push(line);
    }

    flush(&mut sections, current, &body);
    sections
}

fn flush(sections: &mut Sections, title: Option<String>, body: &[&str]) {
    let text = body.join("\n");
    let text = text.trim();

    match title {
        Some(title) => {
            sections.insert_unique(&title, text);
        }
        // Preamble is only kept when it says something
        None if !text.is_empty() => {
            sections.insert_unique(INTRODUCTION_SECTION, text);
        }
        None => {}
    }
}

/// Top-level keys of a mapping. Strings verbatim, everything else as compact JSON.
pub fn mapping_sections(map: &Map<String, Value>) -> Sections {
    map.iter()
        .map(|(key, value)| {
            let body = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.as_str(), body)
        })
        .collect()
}

fn single_section(text: &str) -> Sections {
    let mut sections = Sections::new();
    if !text.trim().is_empty() {
        sections.insert_unique(CONTENT_SECTION, text.trim());
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_with_findings() {
        let sections = markdown_sections("# Report\n\n## Findings\nX happened.");
        let pairs: Vec<(&str, &str)> = sections.iter().collect();
        assert_eq!(pairs, vec![("Report", ""), ("Findings", "X happened.")]);
    }

    #[test]
    fn test_preamble_becomes_introduction() {
        let sections = markdown_sections("Some lead text.\n\n# Details\nMore.");
        let keys: Vec<&str> = sections.keys().collect();
        assert_eq!(keys, vec!["introduction", "Details"]);
        assert_eq!(sections.get("introduction"), Some("Some lead text."));
    }

    #[test]
    fn test_duplicate_headings_suffixed() {
        let sections = markdown_sections("## Notes\na\n## Notes\nb\n## Notes\nc");
        let keys: Vec<&str> = sections.keys().collect();
        assert_eq!(keys, vec!["Notes", "Notes_2", "Notes_3"]);
        assert_eq!(sections.get("Notes_3"), Some("c"));
    }

    #[test]
    fn test_headings_in_fences_ignored() {
        let text = "# Usage\n```sh\n# not a heading\necho hi\n```\n# Next\nend";
        let sections = markdown_sections(text);
        let keys: Vec<&str> = sections.keys().collect();
        assert_eq!(keys, vec!["Usage", "Next"]);
        assert!(sections.get("Usage").unwrap().contains("# not a heading"));
    }

    #[test]
    fn test_list_only_markdown_is_introduction() {
        let sections = markdown_sections("- a\n- b");
        assert_eq!(sections.get("introduction"), Some("- a\n- b"));
    }

    #[test]
    fn test_mapping_sections() {
        let value = json!({"summary": "fine", "scores": [1, 2], "count": 3});
        let sections = mapping_sections(value.as_object().unwrap());
        assert_eq!(sections.get("summary"), Some("fine"));
        assert_eq!(sections.get("scores"), Some("[1,2]"));
        assert_eq!(sections.get("count"), Some("3"));
    }

    #[test]
    fn test_mapping_sections_follow_key_order() {
        let value: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": "a", "mid": [3]}"#).unwrap();
        let sections = mapping_sections(value.as_object().unwrap());
        let keys: Vec<&str> = sections.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_sequence_has_no_sections() {
        let sections = extract_sections(OutputType::Json, &Content::Sequence(vec![json!(1)]));
        assert!(sections.is_empty());
    }

    #[test]
    fn test_text_single_section() {
        let sections = extract_sections(OutputType::Csv, &Content::text("a,b\n1,2\n"));
        assert_eq!(sections.get(CONTENT_SECTION), Some("a,b\n1,2"));
        assert!(extract_sections(OutputType::Text, &Content::empty()).is_empty());
    }
}

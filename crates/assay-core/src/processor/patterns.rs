//! Shared detection patterns.
//!
//! Used by the processor for classification and metadata extraction, and by
//! the validator to re-check the same properties on finished outputs.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // MARKDOWN
    // =========================================================================

    /// ATX heading line: `# Title` .. `###### Title`
    pub static ref HEADING_PATTERN: Regex = Regex::new(
        r"(?m)^ {0,3}#{1,6}[ \t]+\S"
    ).unwrap();

    /// Heading line with the level and title captured
    pub static ref HEADING_LINE: Regex = Regex::new(
        r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$"
    ).unwrap();

    /// Heading-like line missing the space after the hashes (`##Title`)
    pub static ref MALFORMED_HEADING: Regex = Regex::new(
        r"(?m)^ {0,3}#{1,6}[^#\s]"
    ).unwrap();

    /// Bullet or numbered list item
    pub static ref LIST_ITEM_PATTERN: Regex = Regex::new(
        r"(?m)^[ \t]*(?:[-*+]|\d{1,9}[.)])[ \t]+\S"
    ).unwrap();

    /// Opening or closing code fence
    pub static ref FENCE_PATTERN: Regex = Regex::new(
        r"(?m)^ {0,3}(?:```|~~~)"
    ).unwrap();

    // =========================================================================
    // HTML
    // =========================================================================

    /// Opening tag, name captured
    pub static ref HTML_OPEN_TAG: Regex = Regex::new(
        r"<([A-Za-z][A-Za-z0-9]*)(?:\s[^<>]*)?>"
    ).unwrap();

    /// Closing tag, name captured
    pub static ref HTML_CLOSE_TAG: Regex = Regex::new(
        r"</([A-Za-z][A-Za-z0-9]*)\s*>"
    ).unwrap();

    // =========================================================================
    // CITATIONS AND MARKERS
    // =========================================================================

    /// Numbered reference marker: `[1]`, `[12]`
    pub static ref REFERENCE_MARKER: Regex = Regex::new(
        r"\[\d{1,3}\]"
    ).unwrap();

    /// Bare http(s) URL
    pub static ref URL_PATTERN: Regex = Regex::new(
        r#"https?://[^\s<>()\[\]"']+"#
    ).unwrap();

    /// Explicit confidence marker: `confidence: 0.8`, `Confidence score = 85%`
    pub static ref CONFIDENCE_MARKER: Regex = Regex::new(
        r"(?i)\bconfidence(?:[ _]score)?[ \t]*[:=][ \t]*(\d+(?:\.\d+)?|\.\d+)[ \t]*(%)?"
    ).unwrap();

    // =========================================================================
    // TOKENS
    // =========================================================================

    /// Word token for keyword extraction (starts with a letter)
    pub static ref WORD_TOKEN: Regex = Regex::new(
        r"\p{L}[\p{L}\p{N}]*(?:['-][\p{L}\p{N}]+)*"
    ).unwrap();
}

/// Check if content contains a markdown heading.
pub fn contains_heading(content: &str) -> bool {
    HEADING_PATTERN.is_match(content)
}

/// Check if content contains a bullet or numbered list item.
pub fn contains_list_item(content: &str) -> bool {
    LIST_ITEM_PATTERN.is_match(content)
}

/// Check if content contains a code fence.
pub fn contains_fence(content: &str) -> bool {
    FENCE_PATTERN.is_match(content)
}

/// Number of fence lines in the content.
pub fn fence_count(content: &str) -> usize {
    FENCE_PATTERN.find_iter(content).count()
}

/// True when some opening tag has a closing tag with the same name.
pub fn contains_balanced_tag(content: &str) -> bool {
    let closing: std::collections::HashSet<String> = HTML_CLOSE_TAG
        .captures_iter(content)
        .map(|c| c[1].to_ascii_lowercase())
        .collect();

    if closing.is_empty() {
        return false;
    }

    HTML_OPEN_TAG
        .captures_iter(content)
        .any(|c| closing.contains(&c[1].to_ascii_lowercase()))
}

/// True when there are at least two non-empty lines and every one of them
/// holds the same positive number of commas.
pub fn is_delimited_table(content: &str) -> bool {
    let mut counts = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.matches(',').count());

    let first = match counts.next() {
        Some(n) if n > 0 => n,
        _ => return false,
    };

    let mut rows = 1;
    for n in counts {
        if n != first {
            return false;
        }
        rows += 1;
    }

    rows >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_detection() {
        assert!(contains_heading("# Title"));
        assert!(contains_heading("intro\n### Deep heading\nbody"));
        assert!(!contains_heading("#hashtag only"));
        assert!(!contains_heading("Issue #42 is fixed"));
    }

    #[test]
    fn test_heading_line_captures() {
        let caps = HEADING_LINE.captures("## Key Findings ##").unwrap();
        assert_eq!(&caps[1], "##");
        assert_eq!(&caps[2], "Key Findings");
    }

    #[test]
    fn test_list_detection() {
        assert!(contains_list_item("- item"));
        assert!(contains_list_item("text\n  * nested"));
        assert!(contains_list_item("1. first"));
        assert!(!contains_list_item("-not a list"));
        assert!(!contains_list_item("3.14 is pi"));
    }

    #[test]
    fn test_fences() {
        assert!(contains_fence("```rust\nfn main() {}\n```"));
        assert_eq!(fence_count("```\na\n```\n```\nb"), 3);
    }

    #[test]
    fn test_balanced_tags() {
        assert!(contains_balanced_tag("<p>Hello</p>"));
        assert!(contains_balanced_tag("<DIV class=\"x\">a</div>"));
        assert!(!contains_balanced_tag("a < b and c > d"));
        assert!(!contains_balanced_tag("<br>"));
        assert!(!contains_balanced_tag("<p>open</span>"));
    }

    #[test]
    fn test_delimited_table() {
        assert!(is_delimited_table("a,b,c\n1,2,3\n4,5,6"));
        assert!(is_delimited_table("a,b\n\n1,2\n"));
        assert!(!is_delimited_table("a,b,c"));
        assert!(!is_delimited_table("a,b\n1,2,3"));
        assert!(!is_delimited_table("no commas\nat all"));
    }

    #[test]
    fn test_confidence_marker() {
        let caps = CONFIDENCE_MARKER.captures("Confidence: 0.85").unwrap();
        assert_eq!(&caps[1], "0.85");
        let caps = CONFIDENCE_MARKER.captures("confidence score = 90 %").unwrap();
        assert_eq!(&caps[1], "90");
        assert!(caps.get(2).is_some());
        assert!(CONFIDENCE_MARKER.captures("I am confident").is_none());
    }

    #[test]
    fn test_url_and_reference_patterns() {
        assert_eq!(URL_PATTERN.find_iter("see https://a.io/x and http://b.org").count(), 2);
        assert_eq!(REFERENCE_MARKER.find_iter("as shown [1] and [23]").count(), 2);
    }
}

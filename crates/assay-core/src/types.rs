//! Core data model shared by every pipeline stage.
//!
//! A [`StructuredOutput`] is the normalized form of one producer's result.
//! It is created by the processor (or by the aggregator for consolidated
//! results) and later stages only ever return new values derived from it.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Declared type of an output's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Text,
    Json,
    Markdown,
    Html,
    Csv,
    Xml,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Text => "text",
            OutputType::Json => "json",
            OutputType::Markdown => "markdown",
            OutputType::Html => "html",
            OutputType::Csv => "csv",
            OutputType::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    #[default]
    Pending,
    Success,
    Partial,
    Failed,
}

impl OutputStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStatus::Pending => "pending",
            OutputStatus::Success => "success",
            OutputStatus::Partial => "partial",
            OutputStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutputStatus::Success)
    }
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A failure invalidates the output.
    Error,
    /// A failure lowers the score; it invalidates only in strict mode.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// The payload of an output: plain text, a parsed mapping, or a parsed sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
}

impl Content {
    /// Create text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    /// The empty-text floor used for failed outputs.
    pub fn empty() -> Self {
        Content::Text(String::new())
    }

    /// Stringified content. Structured content is rendered as compact JSON.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Content::Text(text) => Cow::Borrowed(text),
            Content::Mapping(map) => Cow::Owned(serde_json::to_string(map).unwrap_or_default()),
            Content::Sequence(items) => Cow::Owned(serde_json::to_string(items).unwrap_or_default()),
        }
    }

    /// True for mapping and sequence content.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Content::Text(_))
    }

    /// True when the stringified content has no visible characters.
    pub fn is_blank(&self) -> bool {
        match self {
            Content::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Structured content as a JSON value; text content as a JSON string.
    pub fn to_value(&self) -> Value {
        match self {
            Content::Text(text) => Value::String(text.clone()),
            Content::Mapping(map) => Value::Object(map.clone()),
            Content::Sequence(items) => Value::Array(items.clone()),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::empty()
    }
}

/// Ordered mapping of section title to section body.
///
/// Insertion order is significant and survives serialization: the sections
/// are written as a JSON object in the order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    entries: Vec<(String, String)>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section, suffixing the title with `_2`, `_3`, ... when it is
    /// already taken. Returns the key actually used.
    pub fn insert_unique(&mut self, title: &str, body: impl Into<String>) -> String {
        let key = if self.contains_key(title) {
            let mut n = 2;
            loop {
                let candidate = format!("{}_{}", title, n);
                if !self.contains_key(&candidate) {
                    break candidate;
                }
                n += 1;
            }
        } else {
            title.to_string()
        };

        self.entries.push((key.clone(), body.into()));
        key
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Sections {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sections = Sections::new();
        for (k, v) in iter {
            sections.insert_unique(k.as_ref(), v);
        }
        sections
    }
}

impl Serialize for Sections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Sections {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SectionsVisitor;

        impl<'de> Visitor<'de> for SectionsVisitor {
            type Value = Sections;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of section titles to section bodies")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Sections, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    entries.push((k, v));
                }
                Ok(Sections { entries })
            }
        }

        deserializer.deserialize_map(SectionsVisitor)
    }
}

/// Attribution and measurements attached to an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// Opaque identifier of the producer
    pub producer_id: String,

    /// Role of the producer (e.g. "Researcher")
    pub producer_role: String,

    /// Task that generated the output
    #[serde(default)]
    pub task_id: Option<String>,

    /// Human-readable task name
    #[serde(default)]
    pub task_name: Option<String>,

    /// Parent workflow
    #[serde(default)]
    pub workflow_id: Option<String>,

    /// When the output was normalized
    pub timestamp: DateTime<Utc>,

    /// Time the producer spent generating the output
    #[serde(default)]
    pub execution_time: Option<Duration>,

    /// Tokens consumed by the producer
    #[serde(default)]
    pub tokens_used: Option<u64>,

    /// Model the producer used
    #[serde(default)]
    pub model_used: Option<String>,

    /// Explicitly stated confidence, in [0, 1]
    #[serde(default)]
    pub confidence_score: Option<f64>,

    /// Number of citation-like references found in the content
    #[serde(default)]
    pub source_count: Option<usize>,

    /// Whitespace-delimited tokens in the stringified content
    #[serde(default)]
    pub word_count: usize,
}

impl OutputMetadata {
    /// Metadata with only the required attribution filled in.
    pub fn new(producer_id: impl Into<String>, producer_role: impl Into<String>) -> Self {
        Self {
            producer_id: producer_id.into(),
            producer_role: producer_role.into(),
            task_id: None,
            task_name: None,
            workflow_id: None,
            timestamp: Utc::now(),
            execution_time: None,
            tokens_used: None,
            model_used: None,
            confidence_score: None,
            source_count: None,
            word_count: 0,
        }
    }
}

/// Outcome of a single rule during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCheck {
    pub rule: String,
    pub severity: Severity,
    pub weight: f64,
    pub passed: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of running the rule engine against an output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// False if any error-severity rule failed (any rule in strict mode)
    pub is_valid: bool,

    /// Weighted share of passed rules, in [0, 1]
    pub validation_score: f64,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    /// Every rule that was evaluated, in evaluation order
    #[serde(default)]
    pub rules_evaluated: Vec<RuleCheck>,
}

/// The normalized representation of one producer's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    pub id: String,
    pub content: Content,
    pub output_type: OutputType,
    pub status: OutputStatus,
    pub metadata: OutputMetadata,

    #[serde(default)]
    pub validation: Option<ValidationResult>,

    #[serde(default)]
    pub sections: Sections,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub processing_notes: Vec<String>,

    /// Set iff the status is `Failed`
    #[serde(default)]
    pub error_details: Option<String>,

    /// Written by persistence collaborators; not produced by this crate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backup_files: Vec<String>,
}

impl StructuredOutput {
    /// Create an output with a fresh id and no derived fields.
    pub fn new(
        content: Content,
        output_type: OutputType,
        status: OutputStatus,
        metadata: OutputMetadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            output_type,
            status,
            metadata,
            validation: None,
            sections: Sections::new(),
            tags: Vec::new(),
            keywords: Vec::new(),
            processing_notes: Vec::new(),
            error_details: None,
            output_file: None,
            backup_files: Vec::new(),
        }
    }

    /// Validation score, if the output has been validated.
    pub fn validation_score(&self) -> Option<f64> {
        self.validation.as_ref().map(|v| v.validation_score)
    }

    /// The first `max_chars` characters of the stringified content, with an
    /// ellipsis when truncated.
    pub fn content_preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.content.to_text(), max_chars)
    }

    /// One-glance summary of the output.
    pub fn summary(&self) -> OutputSummary {
        OutputSummary {
            id: self.id.clone(),
            producer_role: self.metadata.producer_role.clone(),
            status: self.status,
            output_type: self.output_type,
            timestamp: self.metadata.timestamp,
            word_count: self.metadata.word_count,
            validation_score: self.validation_score(),
            tags: self.tags.iter().take(5).cloned().collect(),
            has_errors: self
                .validation
                .as_ref()
                .is_some_and(|v| !v.errors.is_empty()),
        }
    }

    /// Serialize every attribute as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Rebuild an output from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Condensed view of a [`StructuredOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub id: String,
    pub producer_role: String,
    pub status: OutputStatus,
    pub output_type: OutputType,
    pub timestamp: DateTime<Utc>,
    pub word_count: usize,
    pub validation_score: Option<f64>,
    pub tags: Vec<String>,
    pub has_errors: bool,
}

/// Truncate to `max_chars` characters, appending "..." when anything was cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StructuredOutput {
        let mut output = StructuredOutput::new(
            Content::text("# Title\n\nBody text"),
            OutputType::Markdown,
            OutputStatus::Success,
            OutputMetadata::new("agent-1", "Researcher"),
        );
        output.sections.insert_unique("Title", "Body text");
        output.tags = vec!["research".to_string()];
        output
    }

    #[test]
    fn test_sections_keep_insertion_order() {
        let mut sections = Sections::new();
        sections.insert_unique("Zeta", "z");
        sections.insert_unique("Alpha", "a");
        sections.insert_unique("Mid", "m");

        let keys: Vec<&str> = sections.keys().collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);

        let json = serde_json::to_string(&sections).unwrap();
        assert_eq!(json, r#"{"Zeta":"z","Alpha":"a","Mid":"m"}"#);

        let back: Sections = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sections);
    }

    #[test]
    fn test_sections_suffix_duplicates() {
        let mut sections = Sections::new();
        assert_eq!(sections.insert_unique("Notes", "1"), "Notes");
        assert_eq!(sections.insert_unique("Notes", "2"), "Notes_2");
        assert_eq!(sections.insert_unique("Notes", "3"), "Notes_3");
        assert_eq!(sections.get("Notes_2"), Some("2"));
    }

    #[test]
    fn test_content_is_tagged() {
        let content = Content::Mapping(json!({"a": 1}).as_object().unwrap().clone());
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"kind": "mapping", "value": {"a": 1}}));
    }

    #[test]
    fn test_content_to_text() {
        assert_eq!(Content::text("hi there").to_text(), "hi there");
        let seq = Content::Sequence(vec![json!(1), json!("two")]);
        assert_eq!(seq.to_text(), r#"[1,"two"]"#);
        assert!(Content::text("  \n").is_blank());
        assert!(!Content::Sequence(vec![]).is_blank());
    }

    #[test]
    fn test_json_round_trip() {
        let output = sample();
        let json = output.to_json().unwrap();
        let back = StructuredOutput::from_json(&json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_content_preview_truncates_on_chars() {
        let mut output = sample();
        output.content = Content::text("héllo wörld");
        assert_eq!(output.content_preview(5), "héllo...");
        assert_eq!(output.content_preview(50), "héllo wörld");
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.producer_role, "Researcher");
        assert_eq!(summary.validation_score, None);
        assert!(!summary.has_errors);
    }
}

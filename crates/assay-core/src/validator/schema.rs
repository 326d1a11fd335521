//! Output schemas: required sections per output type and quality bounds.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::rule::{Rule, RuleError, RuleOutcome};
use crate::config::ConfigError;
use crate::types::{OutputType, Severity, StructuredOutput};

/// Caller-supplied expectations for an output.
///
/// Loaded from YAML or JSON:
///
/// ```yaml
/// name: research_report
/// required_sections:
///   markdown: [Summary, Findings]
///   json: [summary]
/// min_word_count: 50
/// required_sources: 2
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Section keys that must be present, by output type
    #[serde(default)]
    pub required_sections: BTreeMap<OutputType, Vec<String>>,

    #[serde(default)]
    pub min_word_count: Option<usize>,

    #[serde(default)]
    pub max_word_count: Option<usize>,

    /// Outputs without a stated confidence fail this bound
    #[serde(default)]
    pub min_confidence: Option<f64>,

    #[serde(default)]
    pub required_sources: Option<usize>,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_required_sections(mut self, sections: BTreeMap<OutputType, Vec<String>>) -> Self {
        self.required_sections = sections;
        self
    }

    pub fn require_sections<I, S>(mut self, output_type: OutputType, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_sections
            .entry(output_type)
            .or_default()
            .extend(sections.into_iter().map(Into::into));
        self
    }

    pub fn with_word_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_word_count = min;
        self.max_word_count = max;
        self
    }

    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn with_required_sources(mut self, n: usize) -> Self {
        self.required_sources = Some(n);
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let schema: OutputSchema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let schema: OutputSchema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "schema name must not be empty".to_string(),
            ));
        }

        if let (Some(min), Some(max)) = (self.min_word_count, self.max_word_count) {
            if min > max {
                return Err(ConfigError::ValidationError(format!(
                    "schema '{}': min_word_count {} exceeds max_word_count {}",
                    self.name, min, max
                )));
            }
        }

        if let Some(c) = self.min_confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(ConfigError::ValidationError(format!(
                    "schema '{}': min_confidence {} outside [0, 1]",
                    self.name, c
                )));
            }
        }

        Ok(())
    }

    /// Rules this schema contributes for an output of the given type.
    pub fn rules_for(&self, output_type: OutputType) -> Vec<Arc<dyn Rule>> {
        let mut rules: Vec<Arc<dyn Rule>> = Vec::new();

        if let Some(required) = self.required_sections.get(&output_type) {
            if !required.is_empty() {
                rules.push(Arc::new(RequiredSections {
                    required: required.clone(),
                }));
            }
        }

        if let Some(min) = self.min_word_count {
            rules.push(Arc::new(Bound::MinWords(min)));
        }
        if let Some(max) = self.max_word_count {
            rules.push(Arc::new(Bound::MaxWords(max)));
        }
        if let Some(min) = self.min_confidence {
            rules.push(Arc::new(Bound::MinConfidence(min)));
        }
        if let Some(n) = self.required_sources {
            rules.push(Arc::new(Bound::Sources(n)));
        }

        rules
    }
}

struct RequiredSections {
    required: Vec<String>,
}

impl Rule for RequiredSections {
    fn name(&self) -> &str {
        "schema_required_sections"
    }

    fn description(&self) -> &str {
        "Output must contain the sections the schema requires"
    }

    fn weight(&self) -> f64 {
        2.0
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn evaluate(&self, output: &StructuredOutput) -> Result<RuleOutcome, RuleError> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|key| !output.sections.contains_key(key))
            .map(String::as_str)
            .collect();

        Ok(RuleOutcome::check(missing.is_empty(), || {
            format!("missing required sections: {}", missing.join(", "))
        }))
    }
}

enum Bound {
    MinWords(usize),
    MaxWords(usize),
    MinConfidence(f64),
    Sources(usize),
}

impl Rule for Bound {
    fn name(&self) -> &str {
        match self {
            Bound::MinWords(_) => "schema_min_word_count",
            Bound::MaxWords(_) => "schema_max_word_count",
            Bound::MinConfidence(_) => "schema_min_confidence",
            Bound::Sources(_) => "schema_required_sources",
        }
    }

    fn description(&self) -> &str {
        match self {
            Bound::MinWords(_) => "Output must reach the schema's minimum word count",
            Bound::MaxWords(_) => "Output should stay under the schema's maximum word count",
            Bound::MinConfidence(_) => "Output should state at least the schema's confidence",
            Bound::Sources(_) => "Output must cite the schema's number of sources",
        }
    }

    fn weight(&self) -> f64 {
        1.0
    }

    fn severity(&self) -> Severity {
        match self {
            Bound::MinWords(_) | Bound::Sources(_) => Severity::Error,
            Bound::MaxWords(_) | Bound::MinConfidence(_) => Severity::Warning,
        }
    }

    fn evaluate(&self, output: &StructuredOutput) -> Result<RuleOutcome, RuleError> {
        let meta = &output.metadata;
        let outcome = match *self {
            Bound::MinWords(min) => RuleOutcome::check(meta.word_count >= min, || {
                format!("word count {} below minimum {}", meta.word_count, min)
            }),
            Bound::MaxWords(max) => RuleOutcome::check(meta.word_count <= max, || {
                format!("word count {} exceeds maximum {}", meta.word_count, max)
            }),
            Bound::MinConfidence(min) => match meta.confidence_score {
                Some(c) => RuleOutcome::check(c >= min, || {
                    format!("confidence {} below minimum {}", c, min)
                }),
                None => RuleOutcome::fail(format!("no confidence stated, minimum {}", min)),
            },
            Bound::Sources(n) => {
                let found = meta.source_count.unwrap_or(0);
                RuleOutcome::check(found >= n, || {
                    format!("source count {} below required {}", found, n)
                })
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, OutputMetadata, OutputStatus};

    fn markdown_output() -> StructuredOutput {
        let mut o = StructuredOutput::new(
            Content::text("# Summary\nok"),
            OutputType::Markdown,
            OutputStatus::Success,
            OutputMetadata::new("a", "Researcher"),
        );
        o.sections.insert_unique("Summary", "ok");
        o.sections.insert_unique("Extra", "ignored");
        o.metadata.word_count = 3;
        o
    }

    #[test]
    fn test_yaml_schema() {
        let yaml = r#"
name: research_report
description: Findings for stakeholders
required_sections:
  markdown: [Summary, Findings]
  json: [summary]
min_word_count: 50
required_sources: 2
"#;
        let schema = OutputSchema::from_yaml(yaml).unwrap();
        assert_eq!(schema.required_sections[&OutputType::Markdown], vec!["Summary", "Findings"]);
        assert_eq!(schema.min_word_count, Some(50));
        assert_eq!(schema.rules_for(OutputType::Markdown).len(), 3);
        assert_eq!(schema.rules_for(OutputType::Csv).len(), 2);
    }

    #[test]
    fn test_json_schema() {
        let schema =
            OutputSchema::from_json(r#"{"name": "s", "required_sections": {"json": ["a"]}}"#)
                .unwrap();
        assert_eq!(schema.rules_for(OutputType::Json).len(), 1);
    }

    #[test]
    fn test_invalid_schemas() {
        assert!(OutputSchema::from_yaml("name: ''").is_err());
        assert!(OutputSchema::from_yaml("name: s\nmin_word_count: 9\nmax_word_count: 3").is_err());
        assert!(OutputSchema::from_yaml("name: s\nmin_confidence: 1.5").is_err());
        assert!(OutputSchema::from_yaml("name: s\nrequired_sections:\n  pdf: [a]").is_err());
    }

    #[test]
    fn test_required_sections_rule() {
        let schema = OutputSchema::new("s").require_sections(OutputType::Markdown, ["Summary", "Findings"]);
        let rules = schema.rules_for(OutputType::Markdown);
        let outcome = rules[0].evaluate(&markdown_output()).unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.message.as_deref(), Some("missing required sections: Findings"));

        let schema = OutputSchema::new("s").require_sections(OutputType::Markdown, ["Summary"]);
        let rules = schema.rules_for(OutputType::Markdown);
        assert!(rules[0].evaluate(&markdown_output()).unwrap().passed);
    }

    #[test]
    fn test_bounds() {
        let schema = OutputSchema::new("s")
            .with_word_bounds(Some(2), Some(2))
            .with_min_confidence(0.5)
            .with_required_sources(1);
        let rules = schema.rules_for(OutputType::Markdown);
        let results: Vec<bool> = rules
            .iter()
            .map(|r| r.evaluate(&markdown_output()).unwrap().passed)
            .collect();
        // 3 words; no confidence; no sources
        assert_eq!(results, vec![true, false, false, false]);
        assert_eq!(rules[1].severity(), Severity::Warning);
        assert_eq!(rules[3].severity(), Severity::Error);
    }
}

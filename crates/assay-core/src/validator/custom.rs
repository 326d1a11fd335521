//! Caller-defined rules.

use std::fmt;
use std::sync::Arc;

use super::rule::{Rule, RuleError, RuleOutcome};
use crate::processor::count_words;
use crate::types::{Severity, StructuredOutput};

/// Word-count bounds and keyword requirements on the stringified content.
///
/// Keyword and forbidden-word checks are case-insensitive substring matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentQualityRule {
    pub min_word_count: Option<usize>,
    pub max_word_count: Option<usize>,
    pub required_keywords: Vec<String>,
    pub forbidden_words: Vec<String>,
}

impl ContentQualityRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_words(mut self, n: usize) -> Self {
        self.min_word_count = Some(n);
        self
    }

    pub fn max_words(mut self, n: usize) -> Self {
        self.max_word_count = Some(n);
        self
    }

    pub fn require_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.required_keywords.push(keyword.into());
        self
    }

    pub fn forbid_word(mut self, word: impl Into<String>) -> Self {
        self.forbidden_words.push(word.into());
        self
    }
}

impl Rule for ContentQualityRule {
    fn name(&self) -> &str {
        "content_quality"
    }

    fn description(&self) -> &str {
        "Content must meet quality standards"
    }

    fn weight(&self) -> f64 {
        1.5
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn evaluate(&self, output: &StructuredOutput) -> Result<RuleOutcome, RuleError> {
        if let (Some(min), Some(max)) = (self.min_word_count, self.max_word_count) {
            if min > max {
                return Err(RuleError::Configuration(format!(
                    "min_word_count {} exceeds max_word_count {}",
                    min, max
                )));
            }
        }

        let text = output.content.to_text().to_lowercase();
        let words = count_words(&text);
        let mut problems = Vec::new();

        if let Some(min) = self.min_word_count {
            if words < min {
                problems.push(format!("{} words, minimum {}", words, min));
            }
        }
        if let Some(max) = self.max_word_count {
            if words > max {
                problems.push(format!("{} words, maximum {}", words, max));
            }
        }

        let missing: Vec<&str> = self
            .required_keywords
            .iter()
            .filter(|k| !text.contains(&k.to_lowercase()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            problems.push(format!("missing keywords: {}", missing.join(", ")));
        }

        let present: Vec<&str> = self
            .forbidden_words
            .iter()
            .filter(|w| !w.is_empty() && text.contains(&w.to_lowercase()))
            .map(String::as_str)
            .collect();
        if !present.is_empty() {
            problems.push(format!("forbidden words: {}", present.join(", ")));
        }

        Ok(RuleOutcome::check(problems.is_empty(), || problems.join("; ")))
    }
}

type Predicate = dyn Fn(&StructuredOutput) -> bool + Send + Sync;

/// A named predicate over outputs.
#[derive(Clone)]
pub struct BusinessRule {
    name: String,
    description: String,
    predicate: Arc<Predicate>,
    severity: Severity,
    weight: f64,
    message: Option<String>,
}

impl BusinessRule {
    /// Error severity, weight 1.0.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&StructuredOutput) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            predicate: Arc::new(predicate),
            severity: Severity::Error,
            weight: 1.0,
            message: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Failures only lower the score outside strict mode.
    pub fn warning_only(self) -> Self {
        self.with_severity(Severity::Warning)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Message reported on failure. Defaults to the description.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Debug for BusinessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusinessRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

impl Rule for BusinessRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate(&self, output: &StructuredOutput) -> Result<RuleOutcome, RuleError> {
        Ok(RuleOutcome::check((self.predicate)(output), || {
            self.message
                .clone()
                .unwrap_or_else(|| self.description.clone())
        }))
    }
}

//! The fixed set of built-in rules.
//!
//! Evaluated for every output, in this order:
//!
//! | Rule | Severity | Weight |
//! |------|----------|--------|
//! | `content_exists` | error | 2.0 |
//! | `minimum_content_length` | warning | 1.0 |
//! | `status_consistency` | error | 1.5 |
//! | `metadata_completeness` | error | 1.5 |
//! | `content_type_consistency` | warning | 1.0 |
//! | `word_count_accuracy` | warning | 0.5 |
//! | `forbidden_content` | error | 2.0 |
//! | `proper_encoding` | error | 1.0 |
//! | `json_validity` | error | 2.0 |
//! | `markdown_structure` | warning | 0.5 |
//!
//! Type-specific rules pass for outputs of other types.

use std::sync::Arc;

use super::rule::{Rule, RuleError, RuleOutcome};
use crate::config::ValidatorConfig;
use crate::processor::patterns::{
    contains_heading, contains_list_item, FENCE_PATTERN, HTML_OPEN_TAG, MALFORMED_HEADING,
};
use crate::processor::{count_words, looks_like_csv, parse_structured};
use crate::types::{Content, OutputStatus, OutputType, Severity, StructuredOutput};

type CheckFn = fn(&StructuredOutput, &ValidatorConfig) -> RuleOutcome;

/// A built-in rule: static metadata plus a check reading the shared config.
pub struct BuiltinRule {
    name: &'static str,
    description: &'static str,
    weight: f64,
    severity: Severity,
    check: CheckFn,
    config: Arc<ValidatorConfig>,
}

impl Rule for BuiltinRule {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate(&self, output: &StructuredOutput) -> Result<RuleOutcome, RuleError> {
        Ok((self.check)(output, &self.config))
    }
}

/// Build the built-in rules in evaluation order.
pub fn builtin_rules(config: &ValidatorConfig) -> Vec<Arc<dyn Rule>> {
    let config = Arc::new(config.clone());

    let table: [(&'static str, &'static str, Severity, f64, CheckFn); 10] = [
        (
            "content_exists",
            "Output must have content",
            Severity::Error,
            2.0,
            content_exists,
        ),
        (
            "minimum_content_length",
            "Content must meet the minimum length",
            Severity::Warning,
            1.0,
            minimum_content_length,
        ),
        (
            "status_consistency",
            "Status must agree with content and error details",
            Severity::Error,
            1.5,
            status_consistency,
        ),
        (
            "metadata_completeness",
            "Producer id and role must be present",
            Severity::Error,
            1.5,
            metadata_completeness,
        ),
        (
            "content_type_consistency",
            "Content must match the declared output type",
            Severity::Warning,
            1.0,
            content_type_consistency,
        ),
        (
            "word_count_accuracy",
            "Declared word count must match the content",
            Severity::Warning,
            0.5,
            word_count_accuracy,
        ),
        (
            "forbidden_content",
            "Content must not contain forbidden substrings",
            Severity::Error,
            2.0,
            forbidden_content,
        ),
        (
            "proper_encoding",
            "Content must be cleanly encoded",
            Severity::Error,
            1.0,
            proper_encoding,
        ),
        (
            "json_validity",
            "JSON outputs must hold valid JSON",
            Severity::Error,
            2.0,
            json_validity,
        ),
        (
            "markdown_structure",
            "Markdown outputs must be well formed",
            Severity::Warning,
            0.5,
            markdown_structure,
        ),
    ];

    table
        .into_iter()
        .map(|(name, description, severity, weight, check)| {
            Arc::new(BuiltinRule {
                name,
                description,
                weight,
                severity,
                check,
                config: Arc::clone(&config),
            }) as Arc<dyn Rule>
        })
        .collect()
}

fn content_exists(output: &StructuredOutput, _: &ValidatorConfig) -> RuleOutcome {
    RuleOutcome::check(!output.content.is_blank(), || {
        "Output has no content".to_string()
    })
}

fn minimum_content_length(output: &StructuredOutput, config: &ValidatorConfig) -> RuleOutcome {
    let length = output.content.to_text().chars().count();
    RuleOutcome::check(length >= config.min_content_length, || {
        format!(
            "Content is too short ({} characters, minimum {})",
            length, config.min_content_length
        )
    })
}

fn status_consistency(output: &StructuredOutput, _: &ValidatorConfig) -> RuleOutcome {
    match output.status {
        OutputStatus::Success if output.content.is_blank() => {
            RuleOutcome::fail("Status is success but content is empty")
        }
        OutputStatus::Success if output.error_details.is_some() => {
            RuleOutcome::fail("Status is success but error details are present")
        }
        OutputStatus::Failed if output.error_details.is_none() => {
            RuleOutcome::fail("Status is failed but no error details are recorded")
        }
        _ => RuleOutcome::pass(),
    }
}

fn metadata_completeness(output: &StructuredOutput, _: &ValidatorConfig) -> RuleOutcome {
    let mut missing = Vec::new();
    if output.metadata.producer_id.trim().is_empty() {
        missing.push("producer_id");
    }
    if output.metadata.producer_role.trim().is_empty() {
        missing.push("producer_role");
    }

    RuleOutcome::check(missing.is_empty(), || {
        format!("Missing metadata: {}", missing.join(", "))
    })
}

fn content_type_consistency(output: &StructuredOutput, _: &ValidatorConfig) -> RuleOutcome {
    let consistent = match (&output.output_type, &output.content) {
        (OutputType::Json, Content::Text(text)) => parse_structured(text).is_some(),
        (OutputType::Json, _) => true,
        (_, Content::Mapping(_) | Content::Sequence(_)) => false,
        (OutputType::Markdown, Content::Text(text)) => {
            contains_heading(text) || contains_list_item(text)
        }
        (OutputType::Html, Content::Text(text)) => HTML_OPEN_TAG.is_match(text),
        (OutputType::Csv, Content::Text(text)) => looks_like_csv(text),
        (OutputType::Text | OutputType::Xml, Content::Text(_)) => true,
    };

    RuleOutcome::check(consistent, || {
        format!(
            "Content does not look like declared type {}",
            output.output_type
        )
    })
}

fn word_count_accuracy(output: &StructuredOutput, config: &ValidatorConfig) -> RuleOutcome {
    let actual = count_words(&output.content.to_text());
    let declared = output.metadata.word_count;

    let accurate = if actual == 0 {
        declared == 0
    } else {
        let drift = (declared as f64 - actual as f64).abs() / actual as f64;
        drift <= config.word_count_tolerance
    };

    RuleOutcome::check(accurate, || {
        format!(
            "Declared word count {} differs from actual {}",
            declared, actual
        )
    })
}

fn forbidden_content(output: &StructuredOutput, config: &ValidatorConfig) -> RuleOutcome {
    let text = output.content.to_text().to_lowercase();
    let found: Vec<&str> = config
        .forbidden_substrings
        .iter()
        .filter(|s| !s.is_empty() && text.contains(&s.to_lowercase()))
        .map(String::as_str)
        .collect();

    RuleOutcome::check(found.is_empty(), || {
        format!("Content contains forbidden patterns: {}", found.join(", "))
    })
}

fn proper_encoding(output: &StructuredOutput, _: &ValidatorConfig) -> RuleOutcome {
    let text = output.content.to_text();
    if text.contains('\u{FFFD}') {
        RuleOutcome::fail("Content contains replacement characters")
    } else if text.contains('\0') {
        RuleOutcome::fail("Content contains NUL characters")
    } else {
        RuleOutcome::pass()
    }
}

fn json_validity(output: &StructuredOutput, _: &ValidatorConfig) -> RuleOutcome {
    if output.output_type != OutputType::Json {
        return RuleOutcome::pass();
    }

    match &output.content {
        Content::Text(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(_) => RuleOutcome::pass(),
            Err(e) => RuleOutcome::fail(format!("Content is not valid JSON: {}", e)),
        },
        Content::Mapping(_) | Content::Sequence(_) => RuleOutcome::pass(),
    }
}

fn markdown_structure(output: &StructuredOutput, config: &ValidatorConfig) -> RuleOutcome {
    if output.output_type != OutputType::Markdown {
        return RuleOutcome::pass();
    }

    let text = output.content.to_text();
    let mut problems = Vec::new();

    let mut in_fence = false;
    let mut fences = 0;
    let mut malformed = 0;
    for line in text.lines() {
        if FENCE_PATTERN.is_match(line) {
            in_fence = !in_fence;
            fences += 1;
        } else if !in_fence && MALFORMED_HEADING.is_match(line) {
            malformed += 1;
        }
    }

    if fences % 2 != 0 {
        problems.push("unbalanced code fences".to_string());
    }
    if malformed > 0 {
        problems.push(format!("{} heading(s) without a space after '#'", malformed));
    }
    if text.matches("**").count() % 2 != 0 {
        problems.push("unbalanced bold markers".to_string());
    }
    if text.chars().count() > config.markdown_heading_threshold && !contains_heading(&text) {
        problems.push(format!(
            "no heading in content longer than {} characters",
            config.markdown_heading_threshold
        ));
    }

    RuleOutcome::check(problems.is_empty(), || {
        format!("Markdown structure issues: {}", problems.join("; "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputMetadata;
    use serde_json::json;

    fn output(content: Content, output_type: OutputType) -> StructuredOutput {
        let mut o = StructuredOutput::new(
            content,
            output_type,
            OutputStatus::Success,
            OutputMetadata::new("agent-1", "Analyst"),
        );
        o.metadata.word_count = count_words(&o.content.to_text());
        o
    }

    fn text(s: &str, output_type: OutputType) -> StructuredOutput {
        output(Content::text(s), output_type)
    }

    fn check(rule: CheckFn, output: &StructuredOutput) -> RuleOutcome {
        rule(output, &ValidatorConfig::default())
    }

    #[test]
    fn test_rule_table_order() {
        let rules = builtin_rules(&ValidatorConfig::default());
        let names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        assert_eq!(names[0], "content_exists");
        assert_eq!(names[9], "markdown_structure");
        assert_eq!(rules.len(), 10);
        let total: f64 = rules.iter().map(|r| r.weight()).sum();
        assert!((total - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_content_exists() {
        assert!(check(content_exists, &text("hi", OutputType::Text)).passed);
        assert!(!check(content_exists, &text("  ", OutputType::Text)).passed);
        assert!(check(content_exists, &output(Content::Sequence(vec![]), OutputType::Json)).passed);
    }

    #[test]
    fn test_minimum_length() {
        assert!(!check(minimum_content_length, &text("short", OutputType::Text)).passed);
        assert!(check(minimum_content_length, &text("long enough text", OutputType::Text)).passed);
    }

    #[test]
    fn test_status_consistency() {
        let mut o = text("content", OutputType::Text);
        assert!(check(status_consistency, &o).passed);

        o.error_details = Some("oops".into());
        assert!(!check(status_consistency, &o).passed);

        o.status = OutputStatus::Failed;
        assert!(check(status_consistency, &o).passed);

        o.error_details = None;
        assert!(!check(status_consistency, &o).passed);

        let empty = text("", OutputType::Text);
        assert!(!check(status_consistency, &empty).passed);
    }

    #[test]
    fn test_metadata_completeness() {
        let mut o = text("content", OutputType::Text);
        assert!(check(metadata_completeness, &o).passed);
        o.metadata.producer_role = " ".into();
        let outcome = check(metadata_completeness, &o);
        assert!(!outcome.passed);
        assert!(outcome.message.unwrap().contains("producer_role"));
    }

    #[test]
    fn test_content_type_consistency() {
        assert!(check(content_type_consistency, &text("{\"a\": 1}", OutputType::Json)).passed);
        assert!(!check(content_type_consistency, &text("nope", OutputType::Json)).passed);
        assert!(check(content_type_consistency, &text("# H", OutputType::Markdown)).passed);
        assert!(!check(content_type_consistency, &text("plain", OutputType::Markdown)).passed);
        assert!(check(content_type_consistency, &text("<b>x</b>", OutputType::Html)).passed);
        assert!(!check(content_type_consistency, &text("a,b", OutputType::Csv)).passed);
        let mapping = output(Content::Mapping(json!({"a": 1}).as_object().unwrap().clone()), OutputType::Text);
        assert!(!check(content_type_consistency, &mapping).passed);
    }

    #[test]
    fn test_word_count_accuracy() {
        let mut o = text("one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty", OutputType::Text);
        assert!(check(word_count_accuracy, &o).passed);
        o.metadata.word_count = 21;
        assert!(check(word_count_accuracy, &o).passed);
        o.metadata.word_count = 22;
        assert!(!check(word_count_accuracy, &o).passed);
    }

    #[test]
    fn test_forbidden_content_case_insensitive() {
        let outcome = check(forbidden_content, &text("Run RM -RF / now", OutputType::Text));
        assert!(!outcome.passed);
        assert!(outcome.message.unwrap().contains("rm -rf"));
        assert!(check(forbidden_content, &text("harmless", OutputType::Text)).passed);
    }

    #[test]
    fn test_proper_encoding() {
        assert!(!check(proper_encoding, &text("bad \u{FFFD} char", OutputType::Text)).passed);
        assert!(!check(proper_encoding, &text("nul\0byte", OutputType::Text)).passed);
        assert!(check(proper_encoding, &text("héllo", OutputType::Text)).passed);
    }

    #[test]
    fn test_json_validity() {
        assert!(!check(json_validity, &text("{broken", OutputType::Json)).passed);
        assert!(check(json_validity, &text("{broken", OutputType::Text)).passed);
        assert!(check(json_validity, &output(Content::Sequence(vec![json!(1)]), OutputType::Json)).passed);
    }

    #[test]
    fn test_markdown_structure() {
        assert!(check(markdown_structure, &text("# Title\nBody **bold**", OutputType::Markdown)).passed);
        assert!(!check(markdown_structure, &text("# T\n```\ncode", OutputType::Markdown)).passed);
        assert!(!check(markdown_structure, &text("##Bad heading", OutputType::Markdown)).passed);
        assert!(check(markdown_structure, &text("# T\n```\n#include <x>\n```", OutputType::Markdown)).passed);

        let long = format!("- {}", "word ".repeat(200));
        assert!(!check(markdown_structure, &text(&long, OutputType::Markdown)).passed);
    }
}

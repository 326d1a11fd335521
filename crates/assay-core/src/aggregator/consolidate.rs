//! Consolidation strategies: merge, summary, best.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::analytics::mean;
use super::AggregationError;
use crate::processor::count_words;
use crate::types::{
    Content, OutputMetadata, OutputStatus, OutputType, Sections, StructuredOutput,
};

/// How several outputs become one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationStrategy {
    /// Concatenate every output under a heading per producer
    Merge,
    /// One condensed entry per output
    Summary,
    /// The output with the highest validation score
    Best,
}

impl ConsolidationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsolidationStrategy::Merge => "merge",
            ConsolidationStrategy::Summary => "summary",
            ConsolidationStrategy::Best => "best",
        }
    }
}

impl fmt::Display for ConsolidationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsolidationStrategy {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ConsolidationStrategy::Merge),
            "summary" => Ok(ConsolidationStrategy::Summary),
            "best" => Ok(ConsolidationStrategy::Best),
            _ => Err(AggregationError::InvalidStrategy(s.to_string())),
        }
    }
}

/// Success only when every input succeeded.
fn combined_status(outputs: &[StructuredOutput]) -> OutputStatus {
    if outputs.iter().all(|o| o.status.is_success()) {
        OutputStatus::Success
    } else {
        OutputStatus::Partial
    }
}

fn consolidated_metadata(
    outputs: &[StructuredOutput],
    producer_id: &str,
    role: &str,
) -> OutputMetadata {
    let mut metadata = OutputMetadata::new(producer_id, role);
    metadata.workflow_id = outputs.iter().find_map(|o| o.metadata.workflow_id.clone());
    metadata.source_count = Some(
        outputs
            .iter()
            .filter_map(|o| o.metadata.source_count)
            .sum(),
    );
    let confidences: Vec<f64> = outputs
        .iter()
        .filter_map(|o| o.metadata.confidence_score)
        .collect();
    metadata.confidence_score = mean(&confidences);
    metadata
}

/// Union in first-seen order.
fn union<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut seen = Vec::new();
    for item in lists.flatten() {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

fn sum_opt<T: std::iter::Sum<T>>(values: impl Iterator<Item = Option<T>>) -> Option<T> {
    let present: Vec<T> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.into_iter().sum())
    }
}

pub(super) fn merge(outputs: &[StructuredOutput], role: &str) -> StructuredOutput {
    let mut blocks = Vec::with_capacity(outputs.len());
    let mut sections = Sections::new();

    for output in outputs {
        let producer = &output.metadata.producer_role;
        let text = output.content.to_text();
        blocks.push(format!("## {}\n\n{}", producer, text.trim()));
        sections.insert_unique(producer, text.trim());
    }

    let mut metadata = consolidated_metadata(outputs, "consolidated", role);
    metadata.word_count = outputs.iter().map(|o| o.metadata.word_count).sum();
    metadata.execution_time = sum_opt::<Duration>(outputs.iter().map(|o| o.metadata.execution_time));
    metadata.tokens_used = sum_opt::<u64>(outputs.iter().map(|o| o.metadata.tokens_used));

    let mut merged = StructuredOutput::new(
        Content::Text(blocks.join("\n\n")),
        OutputType::Markdown,
        combined_status(outputs),
        metadata,
    );
    merged.sections = sections;
    merged.tags = union(outputs.iter().map(|o| &o.tags));
    merged.keywords = union(outputs.iter().map(|o| &o.keywords));
    merged
        .processing_notes
        .push(format!("Consolidated from {} outputs by merge", outputs.len()));
    merged
}

pub(super) fn summarize(outputs: &[StructuredOutput], role: &str, preview_words: usize) -> StructuredOutput {
    let mut lines = vec![
        "# Workflow Summary".to_string(),
        String::new(),
        format!("Consolidated results from {} outputs:", outputs.len()),
        String::new(),
    ];
    let mut sections = Sections::new();

    for output in outputs {
        let text = output.content.to_text();
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut preview = words
            .iter()
            .take(preview_words)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if words.len() > preview_words {
            preview.push_str("...");
        }
        let score = output
            .validation_score()
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "n/a".to_string());

        let entry = format!("{} (score {}): {}", output.status, score, preview);
        lines.push(format!("- **{}** {}", output.metadata.producer_role, entry));
        sections.insert_unique(&output.metadata.producer_role, entry);
    }

    let content = lines.join("\n");
    let mut metadata = consolidated_metadata(outputs, "summary", role);
    metadata.word_count = count_words(&content);

    let mut summary = StructuredOutput::new(
        Content::Text(content),
        OutputType::Markdown,
        combined_status(outputs),
        metadata,
    );
    summary.sections = sections;
    summary.tags = union(outputs.iter().map(|o| &o.tags));
    summary
        .processing_notes
        .push(format!("Summary generated from {} outputs", outputs.len()));
    summary
}

/// Highest validation score wins; a missing score counts as 0.0 and the
/// earliest output wins ties.
pub(super) fn best(outputs: &[StructuredOutput], role: &str) -> Option<StructuredOutput> {
    let scores: Vec<f64> = outputs
        .iter()
        .map(|o| o.validation_score().unwrap_or(0.0))
        .collect();

    let mut winner = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[winner] {
            winner = i;
        }
    }

    let mut chosen = outputs.get(winner)?.clone();
    let original_role = std::mem::replace(&mut chosen.metadata.producer_role, role.to_string());

    let candidates: Vec<String> = outputs
        .iter()
        .zip(&scores)
        .enumerate()
        .map(|(i, (o, s))| format!("#{} {}={:.2}", i + 1, o.metadata.producer_role, s))
        .collect();
    chosen.processing_notes.push(format!(
        "Selected output #{} from {} as best of {} by validation score {:.2} (earliest wins ties); candidates: {}",
        winner + 1,
        original_role,
        outputs.len(),
        scores[winner],
        candidates.join(", ")
    ));
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationResult;

    fn output(role: &str, text: &str, score: Option<f64>) -> StructuredOutput {
        let mut o = StructuredOutput::new(
            Content::text(text),
            OutputType::Text,
            OutputStatus::Success,
            OutputMetadata::new(format!("{}-id", role), role),
        );
        o.metadata.word_count = count_words(text);
        o.validation = score.map(|s| ValidationResult {
            is_valid: true,
            validation_score: s,
            errors: vec![],
            warnings: vec![],
            rules_evaluated: vec![],
        });
        o
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Merge".parse::<ConsolidationStrategy>().unwrap(), ConsolidationStrategy::Merge);
        assert!(matches!(
            "vote".parse::<ConsolidationStrategy>(),
            Err(AggregationError::InvalidStrategy(ref s)) if s == "vote"
        ));
    }

    #[test]
    fn test_merge() {
        let mut a = output("Researcher", "alpha beta", None);
        a.tags = vec!["research".into(), "data".into()];
        a.metadata.execution_time = Some(Duration::from_secs(2));
        let mut b = output("Researcher", "gamma delta epsilon", None);
        b.tags = vec!["data".into(), "market".into()];
        b.metadata.execution_time = Some(Duration::from_millis(500));

        let merged = merge(&[a, b], "Editor");
        assert_eq!(merged.status, OutputStatus::Success);
        assert_eq!(merged.output_type, OutputType::Markdown);
        assert_eq!(merged.metadata.word_count, 5);
        assert_eq!(merged.metadata.execution_time, Some(Duration::from_millis(2500)));
        assert_eq!(merged.metadata.producer_role, "Editor");
        assert_eq!(merged.sections.keys().collect::<Vec<_>>(), vec!["Researcher", "Researcher_2"]);
        assert_eq!(merged.tags, vec!["research", "data", "market"]);
        assert_eq!(
            merged.content.to_text(),
            "## Researcher\n\nalpha beta\n\n## Researcher\n\ngamma delta epsilon"
        );
    }

    #[test]
    fn test_merge_partial_status() {
        let mut b = output("B", "text", None);
        b.status = OutputStatus::Failed;
        let merged = merge(&[output("A", "text", None), b], "X");
        assert_eq!(merged.status, OutputStatus::Partial);
    }

    #[test]
    fn test_summary_entries() {
        let long = (1..=30).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let outputs = [output("A", &long, Some(0.75)), output("B", "short text", None)];
        let summary = summarize(&outputs, "Lead", 25);

        let a = summary.sections.get("A").unwrap();
        assert!(a.starts_with("success (score 0.75): w1 w2"));
        assert!(a.ends_with("w25..."));
        assert_eq!(summary.sections.get("B"), Some("success (score n/a): short text"));
        assert_eq!(summary.metadata.word_count, count_words(&summary.content.to_text()));
    }

    #[test]
    fn test_best_prefers_earliest_tie() {
        let outputs = [
            output("A", "a", Some(0.4)),
            output("B", "b", Some(0.9)),
            output("C", "c", Some(0.9)),
        ];
        let chosen = best(&outputs, "Judge").unwrap();
        assert_eq!(chosen.id, outputs[1].id);
        assert_eq!(chosen.metadata.producer_role, "Judge");
        let note = chosen.processing_notes.last().unwrap();
        assert!(note.contains("#1 A=0.40"));
        assert!(note.contains("#3 C=0.90"));
        assert!(note.contains("from B"));
    }

    #[test]
    fn test_best_missing_scores_count_as_zero() {
        let outputs = [output("A", "a", None), output("B", "b", Some(0.1))];
        assert_eq!(best(&outputs, "J").unwrap().id, outputs[1].id);
        assert!(best(&[], "J").is_none());
    }
}

//! Batch analytics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OutputStatus, OutputType, StructuredOutput};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub total_words: usize,
    pub avg_words: f64,
    pub min_words: usize,
    pub max_words: usize,
    pub median_words: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub outputs_with_validation: usize,
    pub avg_validation_score: Option<f64>,
    pub outputs_with_errors: usize,
    pub outputs_with_warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Seconds between workflow start and end
    pub wall_clock_secs: f64,
    pub avg_task_secs: Option<f64>,
    pub min_task_secs: Option<f64>,
    pub max_task_secs: Option<f64>,
    pub avg_confidence: Option<f64>,
}

/// Per-role figures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub count: usize,
    pub success_rate: f64,
    pub avg_score: Option<f64>,
    pub avg_duration_secs: Option<f64>,
    pub avg_words: f64,
}

/// Figures computed over one batch of outputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowAnalytics {
    pub total_outputs: usize,
    pub status_distribution: BTreeMap<OutputStatus, usize>,
    pub success_rate: f64,
    pub content_metrics: ContentMetrics,
    pub quality_metrics: QualityMetrics,
    pub performance_metrics: PerformanceMetrics,
    /// Keyed by producer role
    pub agent_performance: BTreeMap<String, AgentPerformance>,
    /// Distinct output types in first-seen order
    pub output_types: Vec<OutputType>,
}

impl WorkflowAnalytics {
    /// Compute analytics. Word statistics only count outputs with content.
    pub fn compute(outputs: &[StructuredOutput], wall_clock_secs: f64) -> Self {
        let total = outputs.len();

        let mut status_distribution = BTreeMap::new();
        for output in outputs {
            *status_distribution.entry(output.status).or_insert(0) += 1;
        }

        let mut output_types = Vec::new();
        for output in outputs {
            if !output_types.contains(&output.output_type) {
                output_types.push(output.output_type);
            }
        }

        let mut by_role: BTreeMap<String, Vec<&StructuredOutput>> = BTreeMap::new();
        for output in outputs {
            by_role
                .entry(output.metadata.producer_role.clone())
                .or_default()
                .push(output);
        }

        let agent_performance = by_role
            .into_iter()
            .map(|(role, group)| (role, agent_performance(&group)))
            .collect();

        let task_secs: Vec<f64> = outputs
            .iter()
            .filter_map(|o| o.metadata.execution_time)
            .map(|d| d.as_secs_f64())
            .collect();
        let confidences: Vec<f64> = outputs
            .iter()
            .filter_map(|o| o.metadata.confidence_score)
            .collect();

        Self {
            total_outputs: total,
            success_rate: rate(
                outputs.iter().filter(|o| o.status.is_success()).count(),
                total,
            ),
            status_distribution,
            content_metrics: content_metrics(outputs),
            quality_metrics: quality_metrics(outputs),
            performance_metrics: PerformanceMetrics {
                wall_clock_secs: wall_clock_secs.max(0.0),
                avg_task_secs: mean(&task_secs),
                min_task_secs: task_secs.iter().copied().reduce(f64::min),
                max_task_secs: task_secs.iter().copied().reduce(f64::max),
                avg_confidence: mean(&confidences),
            },
            agent_performance,
            output_types,
        }
    }
}

fn content_metrics(outputs: &[StructuredOutput]) -> ContentMetrics {
    let mut words: Vec<usize> = outputs
        .iter()
        .map(|o| o.metadata.word_count)
        .filter(|&w| w > 0)
        .collect();

    if words.is_empty() {
        return ContentMetrics::default();
    }

    words.sort_unstable();
    let total: usize = words.iter().sum();
    let n = words.len();
    let median = if n % 2 == 1 {
        words[n / 2] as f64
    } else {
        (words[n / 2 - 1] + words[n / 2]) as f64 / 2.0
    };

    ContentMetrics {
        total_words: total,
        avg_words: total as f64 / n as f64,
        min_words: words[0],
        max_words: words[n - 1],
        median_words: median,
    }
}

fn quality_metrics(outputs: &[StructuredOutput]) -> QualityMetrics {
    let validations: Vec<_> = outputs.iter().filter_map(|o| o.validation.as_ref()).collect();
    let scores: Vec<f64> = validations.iter().map(|v| v.validation_score).collect();

    QualityMetrics {
        outputs_with_validation: validations.len(),
        avg_validation_score: mean(&scores),
        outputs_with_errors: validations.iter().filter(|v| !v.errors.is_empty()).count(),
        outputs_with_warnings: validations.iter().filter(|v| !v.warnings.is_empty()).count(),
    }
}

fn agent_performance(group: &[&StructuredOutput]) -> AgentPerformance {
    let count = group.len();
    let scores: Vec<f64> = group.iter().filter_map(|o| o.validation_score()).collect();
    let durations: Vec<f64> = group
        .iter()
        .filter_map(|o| o.metadata.execution_time)
        .map(|d| d.as_secs_f64())
        .collect();
    let words: usize = group.iter().map(|o| o.metadata.word_count).sum();

    AgentPerformance {
        count,
        success_rate: rate(group.iter().filter(|o| o.status.is_success()).count(), count),
        avg_score: mean(&scores),
        avg_duration_secs: mean(&durations),
        avg_words: if count == 0 { 0.0 } else { words as f64 / count as f64 },
    }
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Seconds from `start` to `end`, never negative.
pub(crate) fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0);
    millis as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, OutputMetadata, ValidationResult};
    use std::time::Duration;

    fn output(role: &str, status: OutputStatus, words: usize, score: Option<f64>) -> StructuredOutput {
        let mut o = StructuredOutput::new(
            Content::text("x"),
            OutputType::Text,
            status,
            OutputMetadata::new("id", role),
        );
        o.metadata.word_count = words;
        o.validation = score.map(|s| ValidationResult {
            is_valid: s > 0.5,
            validation_score: s,
            errors: if s > 0.5 { vec![] } else { vec!["bad".into()] },
            warnings: vec![],
            rules_evaluated: vec![],
        });
        o
    }

    #[test]
    fn test_success_rate_two_of_three() {
        let outputs = vec![
            output("A", OutputStatus::Success, 10, None),
            output("B", OutputStatus::Success, 20, None),
            output("C", OutputStatus::Failed, 0, None),
        ];
        let analytics = WorkflowAnalytics::compute(&outputs, 0.0);
        assert!((analytics.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(analytics.status_distribution[&OutputStatus::Failed], 1);
        assert_eq!(analytics.content_metrics.total_words, 30);
        assert_eq!(analytics.content_metrics.avg_words, 15.0);
        assert_eq!(analytics.content_metrics.median_words, 15.0);
    }

    #[test]
    fn test_quality_and_roles() {
        let mut slow = output("Writer", OutputStatus::Success, 5, Some(0.4));
        slow.metadata.execution_time = Some(Duration::from_secs(4));
        let outputs = vec![
            output("Researcher", OutputStatus::Success, 7, Some(1.0)),
            slow,
            output("Writer", OutputStatus::Partial, 9, None),
        ];
        let analytics = WorkflowAnalytics::compute(&outputs, 12.5);

        assert_eq!(analytics.quality_metrics.outputs_with_validation, 2);
        let avg = analytics.quality_metrics.avg_validation_score.unwrap();
        assert!((avg - 0.7).abs() < 1e-9);
        assert_eq!(analytics.quality_metrics.outputs_with_errors, 1);

        let writer = &analytics.agent_performance["Writer"];
        assert_eq!(writer.count, 2);
        assert_eq!(writer.success_rate, 0.5);
        assert_eq!(writer.avg_score, Some(0.4));
        assert_eq!(writer.avg_duration_secs, Some(4.0));
        assert_eq!(writer.avg_words, 7.0);

        assert_eq!(analytics.performance_metrics.wall_clock_secs, 12.5);
        assert_eq!(analytics.performance_metrics.avg_task_secs, Some(4.0));
        assert_eq!(analytics.output_types, vec![OutputType::Text]);
    }

    #[test]
    fn test_empty_word_stats() {
        let outputs = vec![output("A", OutputStatus::Failed, 0, None)];
        let analytics = WorkflowAnalytics::compute(&outputs, 0.0);
        assert_eq!(analytics.content_metrics, ContentMetrics::default());
        assert_eq!(analytics.success_rate, 0.0);
    }
}

//! Batch-level aggregation.
//!
//! The aggregator turns a slice of processed outputs into:
//! - workflow analytics and ordered insights ([`ResultAggregator::aggregate_workflow_results`])
//! - a single consolidated output ([`ResultAggregator::create_consolidated_output`])
//! - a multi-criteria ranking ([`ResultAggregator::generate_comparison_report`])
//!
//! Inputs are never mutated.

mod analytics;
mod compare;
mod consolidate;
mod insights;

pub use analytics::{
    AgentPerformance, ContentMetrics, PerformanceMetrics, QualityMetrics, WorkflowAnalytics,
};
pub use compare::{
    parse_criteria, ComparisonReport, Criterion, CriterionError, RankedOutput, DEFAULT_CRITERIA,
};
pub use consolidate::ConsolidationStrategy;
pub use insights::{generate_insights, insight_rule_names};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AggregatorConfig;
use crate::types::StructuredOutput;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Unknown consolidation strategy: {0}")]
    InvalidStrategy(String),

    #[error("No outputs to aggregate")]
    EmptyInput,
}

/// Aggregated view of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub workflow_name: String,
    pub outputs: Vec<StructuredOutput>,
    pub analytics: WorkflowAnalytics,
    pub insights: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Headline figures of a [`WorkflowResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub workflow_name: String,
    pub total_outputs: usize,
    pub success_rate: f64,
    pub total_words: usize,
    pub avg_validation_score: Option<f64>,
    pub duration_secs: f64,
    pub insight_count: usize,
}

impl WorkflowResult {
    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            workflow_id: self.workflow_id.clone(),
            workflow_name: self.workflow_name.clone(),
            total_outputs: self.analytics.total_outputs,
            success_rate: self.analytics.success_rate,
            total_words: self.analytics.content_metrics.total_words,
            avg_validation_score: self.analytics.quality_metrics.avg_validation_score,
            duration_secs: self.analytics.performance_metrics.wall_clock_secs,
            insight_count: self.insights.len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    config: AggregatorConfig,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Compute analytics and insights for a workflow run.
    ///
    /// `start` defaults to the earliest output timestamp and `end` to the
    /// latest one.
    pub fn aggregate_workflow_results(
        &self,
        outputs: &[StructuredOutput],
        workflow_id: &str,
        workflow_name: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<WorkflowResult, AggregationError> {
        let earliest = outputs
            .iter()
            .map(|o| o.metadata.timestamp)
            .min()
            .ok_or(AggregationError::EmptyInput)?;
        let latest = outputs
            .iter()
            .map(|o| o.metadata.timestamp)
            .max()
            .unwrap_or(earliest);

        let start_time = start.unwrap_or(earliest);
        let end_time = end.unwrap_or(latest);
        let wall_clock = analytics::elapsed_secs(start_time, end_time);

        let analytics = WorkflowAnalytics::compute(outputs, wall_clock);
        let insights = generate_insights(&analytics, &self.config);

        info!(
            workflow_id = %workflow_id,
            outputs = outputs.len(),
            success_rate = analytics.success_rate,
            insights = insights.len(),
            "Aggregated workflow results"
        );

        Ok(WorkflowResult {
            workflow_id: workflow_id.to_string(),
            workflow_name: workflow_name.to_string(),
            outputs: outputs.to_vec(),
            analytics,
            insights,
            start_time,
            end_time,
        })
    }

    /// Combine several outputs into one according to `strategy`.
    pub fn create_consolidated_output(
        &self,
        outputs: &[StructuredOutput],
        strategy: ConsolidationStrategy,
        target_role: &str,
    ) -> Result<StructuredOutput, AggregationError> {
        if outputs.is_empty() {
            return Err(AggregationError::EmptyInput);
        }

        let consolidated = match strategy {
            ConsolidationStrategy::Merge => consolidate::merge(outputs, target_role),
            ConsolidationStrategy::Summary => {
                consolidate::summarize(outputs, target_role, self.config.summary_preview_words)
            }
            ConsolidationStrategy::Best => {
                consolidate::best(outputs, target_role).ok_or(AggregationError::EmptyInput)?
            }
        };

        debug!(
            strategy = %strategy,
            inputs = outputs.len(),
            output_id = %consolidated.id,
            "Consolidated outputs"
        );
        Ok(consolidated)
    }

    /// Rank outputs on `criteria`; an empty list means [`DEFAULT_CRITERIA`].
    pub fn generate_comparison_report(
        &self,
        outputs: &[StructuredOutput],
        criteria: &[Criterion],
    ) -> ComparisonReport {
        let report = compare::rank(outputs, criteria);
        debug!(
            outputs = outputs.len(),
            criteria = report.criteria.len(),
            "Generated comparison report"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, OutputMetadata, OutputStatus, OutputType};
    use chrono::Duration;

    fn output(role: &str, status: OutputStatus, words: usize) -> StructuredOutput {
        let mut meta = OutputMetadata::new(role, role);
        meta.word_count = words;
        StructuredOutput::new(Content::text("some words here"), OutputType::Text, status, meta)
    }

    #[test]
    fn test_empty_input() {
        let agg = ResultAggregator::new();
        assert_eq!(
            agg.aggregate_workflow_results(&[], "wf", "Empty", None, None),
            Err(AggregationError::EmptyInput)
        );
        assert_eq!(
            agg.create_consolidated_output(&[], ConsolidationStrategy::Merge, "X"),
            Err(AggregationError::EmptyInput)
        );
        assert!(agg.generate_comparison_report(&[], &[]).rankings.is_empty());
    }

    #[test]
    fn test_success_rate_and_summary() {
        let outputs = vec![
            output("A", OutputStatus::Success, 100),
            output("B", OutputStatus::Success, 200),
            output("C", OutputStatus::Failed, 0),
        ];
        let agg = ResultAggregator::new();
        let start = Utc::now() - Duration::seconds(30);
        let result = agg
            .aggregate_workflow_results(&outputs, "wf-1", "Research", Some(start), None)
            .unwrap();

        assert!((result.analytics.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.outputs.len(), 3);
        assert_eq!(result.start_time, start);
        assert!(result.analytics.performance_metrics.wall_clock_secs >= 29.0);
        assert!(result.insights.iter().any(|i| i.starts_with("Moderate success rate")));

        let summary = result.summary();
        assert_eq!(summary.workflow_name, "Research");
        assert_eq!(summary.total_outputs, 3);
        assert_eq!(summary.total_words, 300);
        assert_eq!(summary.insight_count, result.insights.len());
    }

    #[test]
    fn test_default_window_comes_from_timestamps() {
        let mut a = output("A", OutputStatus::Success, 1);
        let mut b = output("B", OutputStatus::Success, 1);
        let t0 = Utc::now();
        a.metadata.timestamp = t0;
        b.metadata.timestamp = t0 + Duration::seconds(12);

        let result = ResultAggregator::new()
            .aggregate_workflow_results(&[b, a], "wf", "W", None, None)
            .unwrap();
        assert_eq!(result.start_time, t0);
        assert_eq!(result.analytics.performance_metrics.wall_clock_secs, 12.0);
    }

    #[test]
    fn test_consolidation_dispatch() {
        let outputs = vec![
            output("A", OutputStatus::Success, 3),
            output("B", OutputStatus::Success, 3),
        ];
        let agg = ResultAggregator::new();
        let merged = agg
            .create_consolidated_output(&outputs, ConsolidationStrategy::Merge, "Editor")
            .unwrap();
        assert_eq!(merged.status, OutputStatus::Success);
        assert_eq!(merged.metadata.word_count, 6);

        let summary = agg
            .create_consolidated_output(&outputs, ConsolidationStrategy::Summary, "Editor")
            .unwrap();
        assert_eq!(summary.sections.len(), 2);
    }
}

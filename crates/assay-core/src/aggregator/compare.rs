//! Multi-criteria ranking of a batch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OutputStatus, StructuredOutput};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown comparison criterion: {0}")]
pub struct CriterionError(pub String);

/// A measurable property outputs are ranked on. Higher is better for all of
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    WordCount,
    ExecutionTime,
    ConfidenceScore,
    ValidationScore,
    SourceCount,
    TokensUsed,
}

/// Used when a caller asks for no particular criteria.
pub const DEFAULT_CRITERIA: &[Criterion] = &[
    Criterion::ValidationScore,
    Criterion::WordCount,
    Criterion::ConfidenceScore,
];

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::WordCount,
        Criterion::ExecutionTime,
        Criterion::ConfidenceScore,
        Criterion::ValidationScore,
        Criterion::SourceCount,
        Criterion::TokensUsed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::WordCount => "word_count",
            Criterion::ExecutionTime => "execution_time",
            Criterion::ConfidenceScore => "confidence_score",
            Criterion::ValidationScore => "validation_score",
            Criterion::SourceCount => "source_count",
            Criterion::TokensUsed => "tokens_used",
        }
    }

    /// Raw value for one output; missing values read as zero.
    pub fn measure(&self, output: &StructuredOutput) -> f64 {
        let meta = &output.metadata;
        match self {
            Criterion::WordCount => meta.word_count as f64,
            Criterion::ExecutionTime => meta.execution_time.map_or(0.0, |d| d.as_secs_f64()),
            Criterion::ConfidenceScore => meta.confidence_score.unwrap_or(0.0),
            Criterion::ValidationScore => output.validation_score().unwrap_or(0.0),
            Criterion::SourceCount => meta.source_count.unwrap_or(0) as f64,
            Criterion::TokensUsed => meta.tokens_used.unwrap_or(0) as f64,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = CriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Criterion::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| CriterionError(s.to_string()))
    }
}

/// Parse a comma-separated criteria list such as `"word_count,tokens_used"`.
pub fn parse_criteria(list: &str) -> Result<Vec<Criterion>, CriterionError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOutput {
    /// 1-based
    pub rank: usize,
    pub output_id: String,
    pub producer: String,
    pub combined_score: f64,
    pub status: OutputStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub criteria: Vec<Criterion>,
    pub rankings: Vec<RankedOutput>,
}

impl ComparisonReport {
    pub fn winner(&self) -> Option<&RankedOutput> {
        self.rankings.first()
    }
}

/// Min-max scale into [0, 1]; a batch with no spread scores 0.5 everywhere.
fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !range.is_finite() || range <= f64::EPSILON {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

pub(super) fn rank(outputs: &[StructuredOutput], criteria: &[Criterion]) -> ComparisonReport {
    let criteria: Vec<Criterion> = if criteria.is_empty() {
        DEFAULT_CRITERIA.to_vec()
    } else {
        criteria.to_vec()
    };

    let mut combined = vec![0.0; outputs.len()];
    for criterion in &criteria {
        let raw: Vec<f64> = outputs.iter().map(|o| criterion.measure(o)).collect();
        for (total, score) in combined.iter_mut().zip(normalize(&raw)) {
            *total += score;
        }
    }
    let count = criteria.len() as f64;

    let mut order: Vec<usize> = (0..outputs.len()).collect();
    // sort_by is stable, so equal scores keep input order
    order.sort_by(|&a, &b| combined[b].total_cmp(&combined[a]));

    let rankings = order
        .into_iter()
        .enumerate()
        .map(|(i, idx)| {
            let output = &outputs[idx];
            RankedOutput {
                rank: i + 1,
                output_id: output.id.clone(),
                producer: output.metadata.producer_role.clone(),
                combined_score: combined[idx] / count,
                status: output.status,
            }
        })
        .collect();

    ComparisonReport { criteria, rankings }
}

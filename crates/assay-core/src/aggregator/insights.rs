//! Insights: a fixed, ordered table of threshold rules over analytics.

use super::analytics::WorkflowAnalytics;
use crate::config::AggregatorConfig;

type InsightRule = fn(&WorkflowAnalytics, &AggregatorConfig) -> Vec<String>;

/// Evaluated in this order; output order follows it.
const INSIGHT_RULES: &[(&str, InsightRule)] = &[
    ("success", success),
    ("reliability", reliability),
    ("volume", volume),
    ("quality", quality),
    ("validation_errors", validation_errors),
    ("performance_gap", performance_gap),
    ("perfect_role", perfect_role),
    ("long_run", long_run),
    ("fast_run", fast_run),
    ("type_diversity", type_diversity),
];

/// Names of the insight rules in evaluation order.
pub fn insight_rule_names() -> impl Iterator<Item = &'static str> {
    INSIGHT_RULES.iter().map(|(name, _)| *name)
}

pub fn generate_insights(analytics: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    INSIGHT_RULES
        .iter()
        .flat_map(|(_, rule)| rule(analytics, config))
        .collect()
}

fn success(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    if a.total_outputs > 0 && a.success_rate >= 1.0 {
        vec![format!(
            "Perfect execution: all {} outputs completed successfully",
            a.total_outputs
        )]
    } else if a.success_rate >= config.success_rate_threshold {
        vec![format!(
            "High success rate ({:.1}%): most outputs completed successfully",
            a.success_rate * 100.0
        )]
    } else {
        Vec::new()
    }
}

fn reliability(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    if a.success_rate >= config.success_rate_threshold {
        return Vec::new();
    }

    let unsuccessful = a.total_outputs - (a.success_rate * a.total_outputs as f64).round() as usize;
    let band = if a.success_rate >= config.moderate_success_threshold {
        "Moderate"
    } else {
        "Low"
    };
    vec![format!(
        "{} success rate ({:.1}%): {} of {} outputs did not complete successfully",
        band,
        a.success_rate * 100.0,
        unsuccessful,
        a.total_outputs
    )]
}

fn volume(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    let words = a.content_metrics.total_words;
    if words > config.high_volume_words {
        vec![format!("High content volume: {} words generated", words)]
    } else if words > config.high_volume_words / 2 {
        vec![format!("Moderate content volume: {} words generated", words)]
    } else {
        Vec::new()
    }
}

fn quality(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    match a.quality_metrics.avg_validation_score {
        Some(score) if score > config.high_quality_threshold => vec![format!(
            "High quality outputs: average validation score {:.2}",
            score
        )],
        Some(score) if score < config.low_quality_threshold => vec![format!(
            "Low quality outputs: average validation score {:.2}",
            score
        )],
        _ => Vec::new(),
    }
}

fn validation_errors(a: &WorkflowAnalytics, _: &AggregatorConfig) -> Vec<String> {
    match a.quality_metrics.outputs_with_errors {
        0 => Vec::new(),
        1 => vec!["1 output has validation errors".to_string()],
        n => vec![format!("{} outputs have validation errors", n)],
    }
}

/// Roles scoring far above or below the batch average, in role order.
fn performance_gap(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    let Some(batch_avg) = a.quality_metrics.avg_validation_score else {
        return Vec::new();
    };
    if batch_avg <= 0.0 || a.agent_performance.len() < 2 {
        return Vec::new();
    }

    let ratio = config.performance_gap_ratio;
    a.agent_performance
        .iter()
        .filter_map(|(role, perf)| {
            let score = perf.avg_score?;
            if score > batch_avg * ratio {
                Some(format!(
                    "{} outperforms the batch: average score {:.2} vs {:.2}",
                    role, score, batch_avg
                ))
            } else if score * ratio < batch_avg {
                Some(format!(
                    "{} lags the batch: average score {:.2} vs {:.2}",
                    role, score, batch_avg
                ))
            } else {
                None
            }
        })
        .collect()
}

/// First role, in role order, whose every output succeeded.
fn perfect_role(a: &WorkflowAnalytics, _: &AggregatorConfig) -> Vec<String> {
    a.agent_performance
        .iter()
        .find(|(_, perf)| perf.count > 0 && perf.success_rate >= 1.0)
        .map(|(role, perf)| {
            format!(
                "{} achieved perfect performance: {} of {} outputs succeeded",
                role, perf.count, perf.count
            )
        })
        .into_iter()
        .collect()
}

fn long_run(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    let secs = a.performance_metrics.wall_clock_secs;
    if secs > config.long_run_secs {
        vec![format!(
            "Long execution time ({:.0}s): consider optimizing the workflow",
            secs
        )]
    } else {
        Vec::new()
    }
}

/// A zero-width window means no timing was observed, so nothing is said.
fn fast_run(a: &WorkflowAnalytics, config: &AggregatorConfig) -> Vec<String> {
    let secs = a.performance_metrics.wall_clock_secs;
    if secs > 0.0 && secs < config.fast_run_secs {
        vec![format!("Fast execution time ({:.1}s): efficient workflow", secs)]
    } else {
        Vec::new()
    }
}

fn type_diversity(a: &WorkflowAnalytics, _: &AggregatorConfig) -> Vec<String> {
    if a.output_types.len() > 1 {
        let names: Vec<&str> = a.output_types.iter().map(|t| t.as_str()).collect();
        vec![format!("Diverse output types: {}", names.join(", "))]
    } else {
        Vec::new()
    }
}

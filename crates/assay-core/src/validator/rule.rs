//! The rule interface shared by built-in, custom and schema rules.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::types::{RuleCheck, Severity, StructuredOutput};

/// A rule could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("misconfigured rule: {0}")]
    Configuration(String),
}

/// Verdict of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub message: Option<String>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }

    /// Pass when `condition` holds, otherwise fail with the lazily built message.
    pub fn check(condition: bool, message: impl FnOnce() -> String) -> Self {
        if condition {
            Self::pass()
        } else {
            Self::fail(message())
        }
    }
}

/// A named, weighted check against a [`StructuredOutput`].
///
/// Implementations must be deterministic and side-effect free. Errors and
/// panics raised by `evaluate` are recorded as a failed check by the
/// validator and never reach the caller.
pub trait Rule: Send + Sync {
    /// Stable identifier, used in messages and to remove custom rules.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Contribution to the weighted score. Non-positive weights count as zero.
    fn weight(&self) -> f64;

    fn severity(&self) -> Severity;

    fn evaluate(&self, output: &StructuredOutput) -> Result<RuleOutcome, RuleError>;
}

/// Evaluate a rule, turning errors and panics into a failed check.
pub(crate) fn run_rule(rule: &dyn Rule, output: &StructuredOutput) -> RuleCheck {
    let result = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(output)));

    let (passed, message) = match result {
        Ok(Ok(outcome)) => (outcome.passed, outcome.message),
        Ok(Err(e)) => {
            tracing::warn!(
                rule = rule.name(),
                output_id = %output.id,
                error = %e,
                "Rule returned an error"
            );
            (false, Some(format!("rule error: {}", e)))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            tracing::warn!(
                rule = rule.name(),
                output_id = %output.id,
                reason = %reason,
                "Rule panicked"
            );
            (false, Some(format!("rule panicked: {}", reason)))
        }
    };

    let weight = rule.weight();
    RuleCheck {
        rule: rule.name().to_string(),
        severity: rule.severity(),
        weight: if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            0.0
        },
        passed,
        message: if passed {
            None
        } else {
            message.or_else(|| Some(rule.description().to_string()))
        },
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

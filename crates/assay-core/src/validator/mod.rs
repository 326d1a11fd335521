//! Output validator: a weighted rule engine.
//!
//! Every output is checked by the schema's rules (when a schema is given),
//! then the built-in rules, then registered custom rules, then per-call extra
//! rules. The score is the weighted share of passed rules.

mod builtin;
mod custom;
mod rule;
mod schema;

pub use builtin::{builtin_rules, BuiltinRule};
pub use custom::{BusinessRule, ContentQualityRule};
pub use rule::{panic_message, Rule, RuleError, RuleOutcome};
pub use schema::OutputSchema;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ValidatorConfig;
use crate::types::{RuleCheck, Severity, StructuredOutput, ValidationResult};

/// Per-call validation options.
#[derive(Clone, Default)]
pub struct ValidationOptions {
    pub schema: Option<OutputSchema>,

    /// Any failed rule invalidates; warnings are reported as errors
    pub strict_mode: bool,

    /// Rules applied on this call only, after registered custom rules
    pub extra_rules: Vec<Arc<dyn Rule>>,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: &OutputSchema) -> Self {
        Self {
            schema: Some(schema.clone()),
            ..Self::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.extra_rules.push(Arc::new(rule));
        self
    }
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("schema", &self.schema.as_ref().map(|s| &s.name))
            .field("strict_mode", &self.strict_mode)
            .field(
                "extra_rules",
                &self.extra_rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Aggregate counters over a set of validation results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub success_rate: f64,
    pub avg_validation_score: f64,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

/// Runs rules against outputs and scores them.
#[derive(Clone)]
pub struct OutputValidator {
    config: ValidatorConfig,
    builtin: Vec<Arc<dyn Rule>>,
    custom: Vec<Arc<dyn Rule>>,
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OutputValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputValidator")
            .field("config", &self.config)
            .field("custom_rules", &self.custom_rule_names())
            .finish()
    }
}

impl OutputValidator {
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            builtin: builtin_rules(&config),
            config,
            custom: Vec::new(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Register a rule applied to every subsequent validation.
    pub fn add_custom_rule(&mut self, rule: impl Rule + 'static) {
        self.add_shared_rule(Arc::new(rule));
    }

    pub fn add_shared_rule(&mut self, rule: Arc<dyn Rule>) {
        tracing::info!(rule = rule.name(), "Added custom validation rule");
        self.custom.push(rule);
    }

    /// Remove the first registered rule with this name.
    pub fn remove_custom_rule(&mut self, name: &str) -> bool {
        match self.custom.iter().position(|r| r.name() == name) {
            Some(index) => {
                self.custom.remove(index);
                tracing::info!(rule = name, "Removed custom validation rule");
                true
            }
            None => false,
        }
    }

    pub fn custom_rule_names(&self) -> Vec<&str> {
        self.custom.iter().map(|r| r.name()).collect()
    }

    /// Evaluate every applicable rule against the output.
    pub fn validate_output(
        &self,
        output: &StructuredOutput,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let strict = options.strict_mode || self.config.strict_mode;

        let schema_rules = options
            .schema
            .as_ref()
            .map(|s| s.rules_for(output.output_type))
            .unwrap_or_default();

        let checks: Vec<RuleCheck> = schema_rules
            .iter()
            .chain(&self.builtin)
            .chain(&self.custom)
            .chain(&options.extra_rules)
            .map(|rule| rule::run_rule(&**rule, output))
            .collect();

        let result = score(checks, strict);

        tracing::debug!(
            output_id = %output.id,
            is_valid = result.is_valid,
            score = result.validation_score,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validated output"
        );

        result
    }

    /// A copy of the output with its validation result attached.
    pub fn attach(&self, output: &StructuredOutput, options: &ValidationOptions) -> StructuredOutput {
        let mut validated = output.clone();
        validated.validation = Some(self.validate_output(output, options));
        validated
    }

    /// Validate each output independently, preserving order.
    pub fn validate_multiple_outputs(
        &self,
        outputs: &[StructuredOutput],
        options: &ValidationOptions,
    ) -> Vec<ValidationResult> {
        let results: Vec<ValidationResult> = outputs
            .iter()
            .map(|o| self.validate_output(o, options))
            .collect();

        tracing::info!(
            total = results.len(),
            valid = results.iter().filter(|r| r.is_valid).count(),
            "Validated batch"
        );

        results
    }

    /// Counters over a set of results. Empty input yields zeros.
    pub fn get_validation_summary(validations: &[ValidationResult]) -> ValidationSummary {
        if validations.is_empty() {
            return ValidationSummary::default();
        }

        let total = validations.len();
        let valid_count = validations.iter().filter(|v| v.is_valid).count();
        let scores = validations.iter().map(|v| v.validation_score);

        ValidationSummary {
            total,
            valid_count,
            invalid_count: total - valid_count,
            success_rate: valid_count as f64 / total as f64,
            avg_validation_score: scores.clone().sum::<f64>() / total as f64,
            total_errors: validations.iter().map(|v| v.errors.len()).sum(),
            total_warnings: validations.iter().map(|v| v.warnings.len()).sum(),
            min_score: scores.clone().reduce(f64::min),
            max_score: scores.reduce(f64::max),
        }
    }
}

/// Fold rule checks into a result.
fn score(checks: Vec<RuleCheck>, strict: bool) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut passed_weight = 0.0;
    let mut total_weight = 0.0;

    for check in &checks {
        total_weight += check.weight;
        if check.passed {
            passed_weight += check.weight;
            continue;
        }

        let line = format!(
            "{}: {}",
            check.rule,
            check.message.as_deref().unwrap_or("failed")
        );
        if strict || check.severity == Severity::Error {
            errors.push(line);
        } else {
            warnings.push(line);
        }
    }

    let validation_score = if total_weight > 0.0 {
        (passed_weight / total_weight).clamp(0.0, 1.0)
    } else {
        1.0
    };

    ValidationResult {
        is_valid: errors.is_empty(),
        validation_score,
        errors,
        warnings,
        rules_evaluated: checks,
    }
}

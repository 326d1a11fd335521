//! # assay-core
//!
//! Normalization and quality assurance for the outputs of automated
//! producers (agents, tasks, tools).
//!
//! A raw result flows through four stages:
//! - **processor**: classify the content, extract sections, keywords, tags
//!   and metadata into a [`StructuredOutput`]
//! - **validator**: score the output against weighted rules
//! - **formatter**: render one or many outputs as json, html, markdown, csv,
//!   xml, a summary table or a named template
//! - **aggregator**: batch analytics, insights, consolidation and ranking
//!
//! Every stage is synchronous and pure with respect to its inputs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use assay_core::{Attribution, Pipeline, TargetFormat, ValidationOptions};
//!
//! let pipeline = Pipeline::default();
//! let output = pipeline.processor.process_agent_output(
//!     "# Report\n\n## Findings\nGrowth is strong.",
//!     Attribution::new("a1", "Researcher"),
//! );
//! let output = pipeline.validator.attach(&output, &ValidationOptions::new());
//! let html = pipeline.formatter.format_output(
//!     &output,
//!     TargetFormat::Html,
//!     &pipeline.formatter.default_options(),
//! )?;
//! ```

pub mod aggregator;
pub mod config;
pub mod formatter;
pub mod processor;
pub mod types;
pub mod validator;

pub use aggregator::{
    AggregationError, ComparisonReport, ConsolidationStrategy, Criterion, CriterionError,
    RankedOutput, ResultAggregator, WorkflowAnalytics, WorkflowResult, WorkflowSummary,
};
pub use config::{
    AggregatorConfig, ConfigError, FormatterConfig, PipelineConfig, ProcessorConfig,
    ValidatorConfig,
};
pub use formatter::{FormatError, FormatOptions, OutputFormatter, TargetFormat};
pub use processor::{failed_output, Attribution, BatchItem, OutputProcessor, RawOutput};
pub use types::{
    Content, OutputMetadata, OutputStatus, OutputSummary, OutputType, RuleCheck, Sections,
    Severity, StructuredOutput, ValidationResult,
};
pub use validator::{
    BusinessRule, ContentQualityRule, OutputSchema, OutputValidator, Rule, RuleError,
    RuleOutcome, ValidationOptions, ValidationSummary,
};

use thiserror::Error;

/// Any fatal error raised by the library.
#[derive(Error, Debug)]
pub enum AssayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Formatting error: {0}")]
    Format(#[from] FormatError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Criterion(#[from] CriterionError),
}

/// The four stages configured from one [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub processor: OutputProcessor,
    pub validator: OutputValidator,
    pub formatter: OutputFormatter,
    pub aggregator: ResultAggregator,
}

impl Pipeline {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            processor: OutputProcessor::with_config(&config.processor),
            validator: OutputValidator::with_config(config.validator.clone()),
            formatter: OutputFormatter::with_config(&config.formatter),
            aggregator: ResultAggregator::with_config(config.aggregator.clone()),
        }
    }

    /// Process a batch and attach a validation result to every output.
    pub fn process_and_validate(
        &self,
        batch: impl IntoIterator<Item = BatchItem>,
        workflow_id: Option<&str>,
        options: &ValidationOptions,
    ) -> Vec<StructuredOutput> {
        self.processor
            .process_crew_output(batch, workflow_id)
            .iter()
            .map(|output| self.validator.attach(output, options))
            .collect()
    }
}

//! Output processor: normalizes raw producer results into [`StructuredOutput`].
//!
//! Processing is total. Whatever the producer returned, the caller gets an
//! output back; unusable input becomes a `Failed` output with the reason in
//! `error_details`.

mod classify;
mod keywords;
mod metadata;
pub mod patterns;
mod sections;

pub use classify::{classify, looks_like_csv, looks_like_html, looks_like_markdown, parse_structured};
pub use keywords::{KeywordExtractor, STOPWORDS};
pub use metadata::{count_sources, count_words, extract_confidence};
pub use sections::{extract_sections, markdown_sections, CONTENT_SECTION, INTRODUCTION_SECTION};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ProcessorConfig;
use crate::types::{Content, OutputMetadata, OutputStatus, OutputType, StructuredOutput};
use crate::validator::{OutputSchema, OutputValidator, ValidationOptions};

/// A producer result before normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawOutput {
    #[default]
    Null,
    Text(String),
    Mapping(Map<String, Value>),
    Sequence(Vec<Value>),
}

impl RawOutput {
    /// Null, empty or whitespace-only input.
    pub fn is_blank(&self) -> bool {
        match self {
            RawOutput::Null => true,
            RawOutput::Text(text) => text.trim().is_empty(),
            RawOutput::Mapping(_) | RawOutput::Sequence(_) => false,
        }
    }
}

impl From<&str> for RawOutput {
    fn from(text: &str) -> Self {
        RawOutput::Text(text.to_string())
    }
}

impl From<String> for RawOutput {
    fn from(text: String) -> Self {
        RawOutput::Text(text)
    }
}

impl From<Map<String, Value>> for RawOutput {
    fn from(map: Map<String, Value>) -> Self {
        RawOutput::Mapping(map)
    }
}

impl From<Vec<Value>> for RawOutput {
    fn from(items: Vec<Value>) -> Self {
        RawOutput::Sequence(items)
    }
}

impl From<Value> for RawOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawOutput::Null,
            Value::String(s) => RawOutput::Text(s),
            Value::Object(map) => RawOutput::Mapping(map),
            Value::Array(items) => RawOutput::Sequence(items),
            scalar @ (Value::Bool(_) | Value::Number(_)) => RawOutput::Text(scalar.to_string()),
        }
    }
}

impl<T: Into<RawOutput>> From<Option<T>> for RawOutput {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawOutput::Null)
    }
}

/// Who produced an output, and under which task and workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub producer_id: String,
    pub producer_role: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub execution_time: Option<Duration>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub model_used: Option<String>,
}

impl Attribution {
    pub fn new(producer_id: impl Into<String>, producer_role: impl Into<String>) -> Self {
        Self {
            producer_id: producer_id.into(),
            producer_role: producer_role.into(),
            task_id: None,
            task_name: None,
            workflow_id: None,
            execution_time: None,
            tokens_used: None,
            model_used: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = Some(task_name.into());
        self
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = Some(duration);
        self
    }

    pub fn with_tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }

    /// Attribution used for batch items that carry none.
    pub fn placeholder(index: usize) -> Self {
        Self::new(format!("agent_{}", index), "Unknown").with_task(format!("task_{}", index))
    }

    pub fn into_metadata(self) -> OutputMetadata {
        let mut metadata = OutputMetadata::new(self.producer_id, self.producer_role);
        metadata.task_id = self.task_id;
        metadata.task_name = self.task_name;
        metadata.workflow_id = self.workflow_id;
        metadata.execution_time = self.execution_time;
        metadata.tokens_used = self.tokens_used;
        metadata.model_used = self.model_used;
        metadata
    }
}

/// One entry of a batch handed to [`OutputProcessor::process_crew_output`].
#[derive(Debug, Clone, Default)]
pub struct BatchItem {
    pub raw: RawOutput,
    pub attribution: Option<Attribution>,
}

impl BatchItem {
    pub fn new(raw: impl Into<RawOutput>) -> Self {
        Self {
            raw: raw.into(),
            attribution: None,
        }
    }

    pub fn attributed(raw: impl Into<RawOutput>, attribution: Attribution) -> Self {
        Self {
            raw: raw.into(),
            attribution: Some(attribution),
        }
    }
}

/// Normalizes raw producer results.
#[derive(Debug, Clone)]
pub struct OutputProcessor {
    keywords: KeywordExtractor,
}

impl Default for OutputProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputProcessor {
    /// Processor with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&ProcessorConfig::default())
    }

    pub fn with_config(config: &ProcessorConfig) -> Self {
        Self {
            keywords: KeywordExtractor::new(
                config.keyword_limit,
                config.min_keyword_length,
                &config.extra_stopwords,
                &config.tag_vocabulary,
            ),
        }
    }

    /// Normalize one raw result.
    pub fn process_agent_output(
        &self,
        raw: impl Into<RawOutput>,
        attribution: Attribution,
    ) -> StructuredOutput {
        let raw = raw.into();
        let metadata = attribution.into_metadata();

        if raw.is_blank() {
            tracing::warn!(
                producer_id = %metadata.producer_id,
                "Producer returned no content"
            );
            return failed_output(metadata, "No content returned by producer");
        }

        let (output_type, content) = classify(raw);
        let text = content.to_text().into_owned();

        let mut metadata = metadata;
        metadata.word_count = count_words(&text);
        metadata.source_count = Some(count_sources(&text));
        metadata.confidence_score = extract_confidence(&content);

        let sections = extract_sections(output_type, &content);
        let keywords = self.keywords.keywords(&text);
        let tags = self.keywords.tags(&keywords);

        let mut output =
            StructuredOutput::new(content, output_type, OutputStatus::Success, metadata);
        output
            .processing_notes
            .push(format!("Classified as {}", output_type));
        output.sections = sections;
        output.keywords = keywords;
        output.tags = tags;

        tracing::debug!(
            output_id = %output.id,
            producer_id = %output.metadata.producer_id,
            output_type = %output_type,
            word_count = output.metadata.word_count,
            sections = output.sections.len(),
            "Processed output"
        );

        output
    }

    /// Normalize one raw result and check it against a schema.
    ///
    /// An output that fails the schema is downgraded to `Partial`; the
    /// validation result stays attached either way.
    pub fn process_agent_output_with_schema(
        &self,
        raw: impl Into<RawOutput>,
        attribution: Attribution,
        validator: &OutputValidator,
        schema: &OutputSchema,
    ) -> StructuredOutput {
        let output = self.process_agent_output(raw, attribution);
        let validation = validator.validate_output(&output, &ValidationOptions::with_schema(schema));

        let mut output = output;
        if !validation.is_valid && output.status == OutputStatus::Success {
            tracing::warn!(
                output_id = %output.id,
                schema = %schema.name,
                errors = validation.errors.len(),
                "Output does not satisfy schema"
            );
            output.status = OutputStatus::Partial;
            output.processing_notes.push(format!(
                "Downgraded to partial: schema '{}' not satisfied ({})",
                schema.name,
                validation.errors.join("; ")
            ));
        }
        output.validation = Some(validation);
        output
    }

    /// Normalize a batch. Order is preserved and every item yields an output.
    pub fn process_crew_output(
        &self,
        batch: impl IntoIterator<Item = BatchItem>,
        workflow_id: Option<&str>,
    ) -> Vec<StructuredOutput> {
        let outputs: Vec<StructuredOutput> = batch
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let mut attribution = item
                    .attribution
                    .unwrap_or_else(|| Attribution::placeholder(index));
                if let Some(id) = workflow_id {
                    attribution.workflow_id = Some(id.to_string());
                }
                self.process_agent_output(item.raw, attribution)
            })
            .collect();

        let failed = outputs
            .iter()
            .filter(|o| o.status == OutputStatus::Failed)
            .count();
        tracing::info!(
            workflow_id = workflow_id.unwrap_or("-"),
            total = outputs.len(),
            failed,
            "Processed batch"
        );

        outputs
    }
}

/// Failed output with the empty-text content floor.
pub fn failed_output(metadata: OutputMetadata, reason: &str) -> StructuredOutput {
    let mut output = StructuredOutput::new(
        Content::empty(),
        OutputType::Text,
        OutputStatus::Failed,
        metadata,
    );
    output.error_details = Some(reason.to_string());
    output.processing_notes.push(reason.to_string());
    output
}

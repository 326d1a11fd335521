//! Configuration parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_config_schema;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Vocabulary tags are drawn from when none is configured.
pub const DEFAULT_TAG_VOCABULARY: &[&str] = &[
    "analysis",
    "research",
    "report",
    "data",
    "market",
    "marketing",
    "finance",
    "security",
    "performance",
    "technology",
    "strategy",
    "customer",
    "product",
    "design",
    "content",
    "summary",
    "recommendations",
    "findings",
    "trends",
    "risk",
];

/// Substrings that are never acceptable in producer output.
pub const DEFAULT_FORBIDDEN_SUBSTRINGS: &[&str] = &[
    "<script",
    "javascript:",
    "eval(",
    "exec(",
    "system(",
    "rm -rf",
    "format c:",
];

/// Settings for classification, sectioning and keyword extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Maximum number of keywords kept per output
    pub keyword_limit: usize,

    /// Shortest token considered as a keyword
    pub min_keyword_length: usize,

    /// Keywords that also count as tags
    pub tag_vocabulary: Vec<String>,

    /// Stopwords added to the built-in table
    pub extra_stopwords: Vec<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            keyword_limit: 15,
            min_keyword_length: 4,
            tag_vocabulary: DEFAULT_TAG_VOCABULARY.iter().map(|s| s.to_string()).collect(),
            extra_stopwords: Vec::new(),
        }
    }
}

/// Settings for the built-in validation rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum content length in characters
    pub min_content_length: usize,

    /// Allowed relative drift of the declared word count
    pub word_count_tolerance: f64,

    /// Case-insensitive substrings that fail validation
    pub forbidden_substrings: Vec<String>,

    /// Markdown longer than this (in characters) needs at least one heading
    pub markdown_heading_threshold: usize,

    /// Treat warnings as errors
    pub strict_mode: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_content_length: 10,
            word_count_tolerance: 0.05,
            forbidden_substrings: DEFAULT_FORBIDDEN_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            markdown_heading_threshold: 500,
            strict_mode: false,
        }
    }
}

/// Defaults applied to formatting calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatterConfig {
    /// Characters of content kept in CSV rows and previews
    pub preview_length: usize,

    /// Pretty-print JSON documents
    pub pretty_json: bool,

    /// Embed the default stylesheet in HTML documents
    pub include_css: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            preview_length: 200,
            pretty_json: true,
            include_css: true,
        }
    }
}

/// Thresholds used for consolidation and insights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Words kept per entry by the summary consolidation strategy
    pub summary_preview_words: usize,

    /// Below this success rate a reliability insight is emitted
    pub success_rate_threshold: f64,

    /// Reliability insights at or above this rate read as moderate, below it as low
    pub moderate_success_threshold: f64,

    /// A role scoring this many times the batch average is called out
    pub performance_gap_ratio: f64,

    /// Below this average validation score a quality insight is emitted
    pub low_quality_threshold: f64,

    /// Above this average validation score a quality insight is emitted
    pub high_quality_threshold: f64,

    /// Total words above which the batch counts as high volume
    pub high_volume_words: usize,

    /// Wall-clock seconds above which the run counts as long
    pub long_run_secs: f64,

    /// Wall-clock seconds below which a measured run counts as fast
    pub fast_run_secs: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            summary_preview_words: 25,
            success_rate_threshold: 0.8,
            moderate_success_threshold: 0.5,
            performance_gap_ratio: 2.0,
            low_quality_threshold: 0.6,
            high_quality_threshold: 0.9,
            high_volume_words: 10_000,
            long_run_secs: 300.0,
            fast_run_secs: 30.0,
        }
    }
}

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub processor: ProcessorConfig,
    pub validator: ValidatorConfig,
    pub formatter: FormatterConfig,
    pub aggregator: AggregatorConfig,
}

impl PipelineConfig {
    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        // An empty YAML document parses as null
        let value = if value.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            value
        };

        validate_config_schema(&value).map_err(ConfigError::SchemaError)?;

        let config: PipelineConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check constraints the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processor.keyword_limit == 0 {
            return Err(ConfigError::ValidationError(
                "processor.keyword_limit must be positive".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.validator.word_count_tolerance) {
            return Err(ConfigError::ValidationError(
                "validator.word_count_tolerance must be within [0, 1]".to_string(),
            ));
        }

        if self.formatter.preview_length == 0 {
            return Err(ConfigError::ValidationError(
                "formatter.preview_length must be positive".to_string(),
            ));
        }

        let agg = &self.aggregator;
        if agg.low_quality_threshold > agg.high_quality_threshold {
            return Err(ConfigError::ValidationError(format!(
                "aggregator.low_quality_threshold ({}) exceeds high_quality_threshold ({})",
                agg.low_quality_threshold, agg.high_quality_threshold
            )));
        }
        if agg.moderate_success_threshold > agg.success_rate_threshold {
            return Err(ConfigError::ValidationError(format!(
                "aggregator.moderate_success_threshold ({}) exceeds success_rate_threshold ({})",
                agg.moderate_success_threshold, agg.success_rate_threshold
            )));
        }
        if agg.fast_run_secs > agg.long_run_secs {
            return Err(ConfigError::ValidationError(format!(
                "aggregator.fast_run_secs ({}) exceeds long_run_secs ({})",
                agg.fast_run_secs, agg.long_run_secs
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = PipelineConfig::from_yaml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.processor.keyword_limit, 15);
        assert_eq!(config.formatter.preview_length, 200);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
processor:
  keyword_limit: 5
  tag_vocabulary: ["climate", "energy"]
validator:
  strict_mode: true
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.processor.keyword_limit, 5);
        assert_eq!(config.processor.min_keyword_length, 4);
        assert_eq!(config.processor.tag_vocabulary, vec!["climate", "energy"]);
        assert!(config.validator.strict_mode);
        assert_eq!(config.validator.min_content_length, 10);
    }

    #[test]
    fn test_json_config() {
        let config =
            PipelineConfig::from_json(r#"{"formatter": {"preview_length": 80}}"#).unwrap();
        assert_eq!(config.formatter.preview_length, 80);
    }

    #[test]
    fn test_unknown_field_rejected_by_schema() {
        let result = PipelineConfig::from_yaml("processor:\n  keyword_cap: 3\n");
        assert!(matches!(result, Err(ConfigError::SchemaError(_))));
    }

    #[test]
    fn test_out_of_range_tolerance_rejected() {
        let result = PipelineConfig::from_yaml("validator:\n  word_count_tolerance: 1.5\n");
        assert!(matches!(result, Err(ConfigError::SchemaError(_))));
    }

    #[test]
    fn test_inverted_quality_thresholds_rejected() {
        let yaml = r#"
aggregator:
  low_quality_threshold: 0.95
  high_quality_threshold: 0.5
"#;
        let result = PipelineConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_inverted_run_and_success_bands_rejected() {
        let result = PipelineConfig::from_yaml("aggregator:\n  fast_run_secs: 600\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = PipelineConfig::from_yaml("aggregator:\n  moderate_success_threshold: 0.9\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}

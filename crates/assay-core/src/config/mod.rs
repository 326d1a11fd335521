//! Pipeline configuration.
//!
//! Configuration documents are YAML or JSON, checked against an embedded
//! JSON Schema and then against semantic constraints. Every field has a
//! default, so an empty document is a valid configuration.

mod parser;
mod schema;

pub use parser::{
    AggregatorConfig, ConfigError, FormatterConfig, PipelineConfig, ProcessorConfig,
    ValidatorConfig,
};

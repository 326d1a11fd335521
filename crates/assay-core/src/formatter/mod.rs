//! Output formatter: renders outputs into external document formats.
//!
//! Formatting is pure. Outputs are only read, and every call returns a new
//! document string.

mod escape;
mod html;
mod markdown;
mod tabular;
mod template;
mod xml;

pub use escape::{cdata, escape_html, escape_xml};
pub use template::{BUILTIN_TEMPLATES, PLACEHOLDER};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::FormatterConfig;
use crate::types::StructuredOutput;

/// Errors raised while formatting.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Template format requires a template name")]
    MissingTemplate,

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Document formats an output can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Json,
    Html,
    Markdown,
    Csv,
    Xml,
    Summary,
    Template,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 7] = [
        TargetFormat::Json,
        TargetFormat::Html,
        TargetFormat::Markdown,
        TargetFormat::Csv,
        TargetFormat::Xml,
        TargetFormat::Summary,
        TargetFormat::Template,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Json => "json",
            TargetFormat::Html => "html",
            TargetFormat::Markdown => "markdown",
            TargetFormat::Csv => "csv",
            TargetFormat::Xml => "xml",
            TargetFormat::Summary => "summary",
            TargetFormat::Template => "template",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "md" => return Ok(TargetFormat::Markdown),
            "htm" => return Ok(TargetFormat::Html),
            _ => {}
        }
        TargetFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| FormatError::UnsupportedFormat(s.to_string()))
    }
}

/// Per-call formatting options.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    /// Pretty-print JSON
    pub pretty: bool,

    /// Render the metadata block in html and markdown
    pub include_metadata: bool,

    /// Embed the stylesheet in html
    pub include_css: bool,

    /// Document title for html, markdown and the report template
    pub title: Option<String>,

    /// Characters of content in CSV previews
    pub preview_length: usize,

    /// Template name for the template format
    pub template: Option<String>,

    /// Template variables; these override output fields
    pub variables: BTreeMap<String, String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from_config(&FormatterConfig::default())
    }
}

impl FormatOptions {
    pub fn from_config(config: &FormatterConfig) -> Self {
        Self {
            pretty: config.pretty_json,
            include_metadata: true,
            include_css: config.include_css,
            title: None,
            preview_length: config.preview_length,
            template: None,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn without_metadata(mut self) -> Self {
        self.include_metadata = false;
        self
    }

    pub fn without_css(mut self) -> Self {
        self.include_css = false;
        self
    }
}

/// Renders outputs. Holds the template registry.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    templates: BTreeMap<String, String>,
    defaults: FormatOptions,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::with_config(&FormatterConfig::default())
    }

    pub fn with_config(config: &FormatterConfig) -> Self {
        Self {
            templates: BUILTIN_TEMPLATES
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            defaults: FormatOptions::from_config(config),
        }
    }

    /// Options seeded from this formatter's configuration.
    pub fn default_options(&self) -> FormatOptions {
        self.defaults.clone()
    }

    /// Register a template, replacing any template with the same name.
    pub fn register_template(&mut self, name: impl Into<String>, body: impl Into<String>) {
        let name = name.into();
        tracing::debug!(template = %name, "Registered template");
        self.templates.insert(name, body.into());
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Render one output.
    pub fn format_output(
        &self,
        output: &StructuredOutput,
        target: TargetFormat,
        options: &FormatOptions,
    ) -> Result<String, FormatError> {
        let document = match target {
            TargetFormat::Json => json_document(output, options)?,
            TargetFormat::Html => html::document(std::slice::from_ref(output), options, false),
            TargetFormat::Markdown => markdown::render_output(output, options),
            TargetFormat::Csv => tabular::csv_table(std::slice::from_ref(output), options)?,
            TargetFormat::Xml => xml::document(output),
            TargetFormat::Summary => tabular::summary_line(output),
            TargetFormat::Template => {
                let body = self.template_for(options)?;
                template::render(body, output, options)
            }
        };

        tracing::debug!(output_id = %output.id, format = %target, bytes = document.len(), "Formatted output");
        Ok(document)
    }

    /// Render a batch, either as one combined document or one per output.
    pub fn format_multiple_outputs(
        &self,
        outputs: &[StructuredOutput],
        target: TargetFormat,
        aggregate: bool,
        options: &FormatOptions,
    ) -> Result<Vec<String>, FormatError> {
        if !aggregate {
            return outputs
                .iter()
                .map(|o| self.format_output(o, target, options))
                .collect();
        }

        let document = match target {
            TargetFormat::Json => {
                if options.pretty {
                    serde_json::to_string_pretty(outputs)?
                } else {
                    serde_json::to_string(outputs)?
                }
            }
            TargetFormat::Html => html::document(outputs, options, true),
            TargetFormat::Markdown => markdown::render_batch(outputs, options),
            TargetFormat::Csv => tabular::csv_table(outputs, options)?,
            TargetFormat::Xml => xml::batch_document(outputs),
            TargetFormat::Summary => tabular::summary_table(outputs),
            TargetFormat::Template => {
                let body = self.template_for(options)?;
                outputs
                    .iter()
                    .map(|o| template::render(body, o, options))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        };

        tracing::info!(outputs = outputs.len(), format = %target, "Formatted batch");
        Ok(vec![document])
    }

    fn template_for(&self, options: &FormatOptions) -> Result<&str, FormatError> {
        let name = options
            .template
            .as_deref()
            .ok_or(FormatError::MissingTemplate)?;
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| FormatError::UnknownTemplate(name.to_string()))
    }
}

fn json_document(output: &StructuredOutput, options: &FormatOptions) -> Result<String, FormatError> {
    let json = if options.pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(json)
}

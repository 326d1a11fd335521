//! `{{ placeholder }}` templates.
//!
//! Placeholders resolve from the caller's variables first, then from output
//! fields. Known fields that are absent render empty. Names that resolve to
//! nothing are left in place verbatim.

use std::borrow::Cow;
use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::FormatOptions;
use crate::types::{truncate_chars, StructuredOutput};

lazy_static! {
    /// `{{ name }}`, `{{name}}`, `{{ sections.Key Findings }}`
    pub static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[^{}]+?)?)\s*\}\}").unwrap();
}

/// Templates available in every formatter.
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("brief", "{{ producer_role }} ({{ status }}): {{ preview }}"),
    (
        "report",
        "# {{ title }}\n\n\
         - Producer: {{ producer_role }} ({{ producer_id }})\n\
         - Task: {{ task_name }}\n\
         - Status: {{ status }}\n\
         - Generated: {{ timestamp }}\n\
         - Words: {{ word_count }}\n\
         - Validation score: {{ validation_score }}\n\n\
         {{ content }}\n\n\
         Tags: {{ tags }}\n",
    ),
    (
        "notification",
        "[{{ status }}] {{ producer_role }} finished {{ task_name }}: {{ word_count }} words, validation {{ validation_score }}",
    ),
];

const TEMPLATE_PREVIEW_CHARS: usize = 100;

pub(super) fn render(template: &str, output: &StructuredOutput, options: &FormatOptions) -> String {
    let fields = output_fields(output, options);

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            if let Some(value) = options.variables.get(name) {
                return Cow::Owned(value.clone());
            }
            if let Some(value) = fields.get(name) {
                return Cow::Owned(value.clone());
            }
            if let Some(key) = name.strip_prefix("sections.") {
                if let Some(body) = output.sections.get(key) {
                    return Cow::Owned(body.to_string());
                }
            }
            Cow::Owned(caps[0].to_string())
        })
        .into_owned()
}

fn output_fields(output: &StructuredOutput, options: &FormatOptions) -> BTreeMap<&'static str, String> {
    let meta = &output.metadata;
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut fields = BTreeMap::new();
    fields.insert("id", output.id.clone());
    fields.insert("content", output.content.to_text().into_owned());
    fields.insert(
        "preview",
        truncate_chars(&output.content.to_text(), TEMPLATE_PREVIEW_CHARS).replace('\n', " "),
    );
    fields.insert("output_type", output.output_type.to_string());
    fields.insert("status", output.status.to_string());
    fields.insert("producer_id", meta.producer_id.clone());
    fields.insert("producer_role", meta.producer_role.clone());
    fields.insert("task_id", opt(&meta.task_id));
    fields.insert("task_name", opt(&meta.task_name));
    fields.insert("workflow_id", opt(&meta.workflow_id));
    fields.insert("model_used", opt(&meta.model_used));
    fields.insert("timestamp", meta.timestamp.to_rfc3339());
    fields.insert("word_count", meta.word_count.to_string());
    fields.insert(
        "execution_time",
        meta.execution_time
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_default(),
    );
    fields.insert(
        "confidence_score",
        meta.confidence_score
            .map(|c| format!("{:.2}", c))
            .unwrap_or_default(),
    );
    fields.insert(
        "validation_score",
        output
            .validation_score()
            .map(|s| format!("{:.2}", s))
            .unwrap_or_default(),
    );
    fields.insert(
        "is_valid",
        output
            .validation
            .as_ref()
            .map(|v| v.is_valid.to_string())
            .unwrap_or_default(),
    );
    fields.insert("tags", output.tags.join(", "));
    fields.insert("keywords", output.keywords.join(", "));
    fields.insert("sections", output.sections.keys().collect::<Vec<_>>().join(", "));
    fields.insert(
        "title",
        options
            .title
            .clone()
            .unwrap_or_else(|| format!("Output from {}", meta.producer_role)),
    );
    fields
}

//! XML rendering. Attributes are escaped, content goes in CDATA.

use super::escape::{cdata, escape_xml};
use crate::types::StructuredOutput;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub(super) fn document(output: &StructuredOutput) -> String {
    format!("{}\n{}", DECLARATION, element(output, ""))
}

pub(super) fn batch_document(outputs: &[StructuredOutput]) -> String {
    let mut parts = vec![
        DECLARATION.to_string(),
        format!("<outputs count=\"{}\">", outputs.len()),
    ];
    parts.extend(outputs.iter().map(|o| element(o, "  ")));
    parts.push("</outputs>".to_string());
    parts.join("\n")
}

fn element(output: &StructuredOutput, indent: &str) -> String {
    let meta = &output.metadata;
    let mut lines = vec![format!(
        "<output id=\"{}\" type=\"{}\" status=\"{}\">",
        escape_xml(&output.id),
        output.output_type,
        output.status
    )];

    lines.push("  <metadata>".to_string());
    let mut fields = vec![
        ("producer_id", escape_xml(&meta.producer_id)),
        ("producer_role", escape_xml(&meta.producer_role)),
        ("timestamp", meta.timestamp.to_rfc3339()),
        ("word_count", meta.word_count.to_string()),
    ];
    if let Some(task) = &meta.task_name {
        fields.push(("task_name", escape_xml(task)));
    }
    if let Some(workflow) = &meta.workflow_id {
        fields.push(("workflow_id", escape_xml(workflow)));
    }
    if let Some(elapsed) = meta.execution_time {
        fields.push(("execution_time", format!("{:.3}", elapsed.as_secs_f64())));
    }
    for (name, value) in fields {
        lines.push(format!("    <{0}>{1}</{0}>", name, value));
    }
    lines.push("  </metadata>".to_string());

    lines.push(format!("  <content>{}</content>", cdata(&output.content.to_text())));

    if !output.sections.is_empty() {
        lines.push("  <sections>".to_string());
        for (name, body) in output.sections.iter() {
            lines.push(format!(
                "    <section name=\"{}\">{}</section>",
                escape_xml(name),
                cdata(body)
            ));
        }
        lines.push("  </sections>".to_string());
    }

    if !output.tags.is_empty() {
        let tags: Vec<String> = output
            .tags
            .iter()
            .map(|t| format!("<tag>{}</tag>", escape_xml(t)))
            .collect();
        lines.push(format!("  <tags>{}</tags>", tags.concat()));
    }

    if let Some(validation) = &output.validation {
        lines.push(format!(
            "  <validation valid=\"{}\" score=\"{:.3}\" errors=\"{}\" warnings=\"{}\"/>",
            validation.is_valid,
            validation.validation_score,
            validation.errors.len(),
            validation.warnings.len()
        ));
    }

    lines.push("</output>".to_string());
    lines
        .iter()
        .map(|line| format!("{}{}", indent, line))
        .collect::<Vec<_>>()
        .join("\n")
}

//! Markdown rendering.

use super::escape::display_title;
use super::FormatOptions;
use crate::types::{Content, OutputStatus, StructuredOutput};

pub(super) fn render_output(output: &StructuredOutput, options: &FormatOptions) -> String {
    let title = options
        .title
        .clone()
        .unwrap_or_else(|| format!("Output from {}", output.metadata.producer_role));

    let mut parts = vec![format!("# {}", title), String::new()];
    parts.extend(body(output, options.include_metadata));
    parts.join("\n")
}

pub(super) fn render_batch(outputs: &[StructuredOutput], options: &FormatOptions) -> String {
    let title = options
        .title
        .clone()
        .unwrap_or_else(|| "Execution Results".to_string());
    let successful = outputs
        .iter()
        .filter(|o| o.status == OutputStatus::Success)
        .count();

    let mut parts = vec![
        format!("# {}", title),
        String::new(),
        "## Execution Summary".to_string(),
        String::new(),
        format!("- **Total Outputs**: {}", outputs.len()),
        format!("- **Successful**: {}/{}", successful, outputs.len()),
    ];
    if let Some(latest) = outputs.iter().map(|o| o.metadata.timestamp).max() {
        parts.push(format!(
            "- **Latest Output**: {}",
            latest.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    parts.push(String::new());

    for (i, output) in outputs.iter().enumerate() {
        parts.push(format!(
            "## Output {}: {}",
            i + 1,
            output.metadata.producer_role
        ));
        parts.push(String::new());
        parts.extend(body(output, options.include_metadata));
        parts.push(String::new());
        parts.push("---".to_string());
        parts.push(String::new());
    }

    parts.join("\n")
}

fn body(output: &StructuredOutput, include_metadata: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let meta = &output.metadata;

    if include_metadata {
        parts.push("### Metadata".to_string());
        parts.push(String::new());
        parts.push(format!("- **Producer**: {} ({})", meta.producer_role, meta.producer_id));
        parts.push(format!("- **Status**: {}", output.status));
        parts.push(format!("- **Type**: {}", output.output_type));
        parts.push(format!("- **Timestamp**: {}", meta.timestamp.to_rfc3339()));
        if let Some(task) = &meta.task_name {
            parts.push(format!("- **Task**: {}", task));
        }
        if meta.word_count > 0 {
            parts.push(format!("- **Word Count**: {}", meta.word_count));
        }
        if let Some(elapsed) = meta.execution_time {
            parts.push(format!("- **Execution Time**: {:.2}s", elapsed.as_secs_f64()));
        }
        parts.push(String::new());
    }

    parts.push("### Content".to_string());
    parts.push(String::new());
    match &output.content {
        Content::Text(text) => parts.push(text.clone()),
        structured => {
            parts.push("```json".to_string());
            parts.push(
                serde_json::to_string_pretty(&structured.to_value())
                    .unwrap_or_else(|_| structured.to_text().into_owned()),
            );
            parts.push("```".to_string());
        }
    }
    parts.push(String::new());

    // Markdown content already shows its own sections
    if !output.sections.is_empty() && !matches!(output.content, Content::Text(_)) {
        parts.push("### Sections".to_string());
        parts.push(String::new());
        for (name, text) in output.sections.iter() {
            parts.push(format!("#### {}", display_title(name)));
            parts.push(String::new());
            parts.push(text.to_string());
            parts.push(String::new());
        }
    }

    if !output.tags.is_empty() {
        parts.push(format!("**Tags**: {}", output.tags.join(", ")));
    }
    if !output.keywords.is_empty() {
        parts.push(format!("**Keywords**: {}", output.keywords.join(", ")));
    }

    if let Some(validation) = &output.validation {
        parts.push(String::new());
        parts.push("### Validation".to_string());
        parts.push(String::new());
        parts.push(format!("- **Valid**: {}", validation.is_valid));
        parts.push(format!("- **Score**: {:.2}", validation.validation_score));
        if !validation.errors.is_empty() {
            parts.push(format!("- **Errors**: {}", validation.errors.len()));
        }
        if !validation.warnings.is_empty() {
            parts.push(format!("- **Warnings**: {}", validation.warnings.len()));
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{Attribution, OutputProcessor};

    #[test]
    fn test_single_output() {
        let output = OutputProcessor::new().process_agent_output(
            r#"{"summary": "Revenue up", "risks": ["fx"]}"#,
            Attribution::new("a-1", "Analyst"),
        );
        let md = render_output(&output, &FormatOptions::default());
        assert!(md.starts_with("# Output from Analyst\n"));
        assert!(md.contains("- **Status**: success"));
        assert!(md.contains("```json"));
        assert!(md.contains("#### Summary"));
    }

    #[test]
    fn test_metadata_can_be_omitted() {
        let output = OutputProcessor::new()
            .process_agent_output("Short note here.", Attribution::new("a-1", "Writer"));
        let md = render_output(&output, &FormatOptions::default().without_metadata());
        assert!(!md.contains("### Metadata"));
        assert!(md.contains("Short note here."));
    }

    #[test]
    fn test_batch_report() {
        let processor = OutputProcessor::new();
        let outputs = vec![
            processor.process_agent_output("first note", Attribution::new("a", "One")),
            processor.process_agent_output("", Attribution::new("b", "Two")),
        ];
        let md = render_batch(&outputs, &FormatOptions::default().with_title("Weekly"));
        assert!(md.starts_with("# Weekly\n"));
        assert!(md.contains("- **Successful**: 1/2"));
        assert!(md.contains("## Output 2: Two"));
    }

    #[test]
    fn test_batch_report_is_deterministic() {
        let processor = OutputProcessor::new();
        let outputs = vec![
            processor.process_agent_output("alpha note", Attribution::new("a", "One")),
            processor.process_agent_output("beta note", Attribution::new("b", "Two")),
        ];
        let options = FormatOptions::default();
        assert_eq!(render_batch(&outputs, &options), render_batch(&outputs, &options));

        let latest = outputs[1].metadata.timestamp.max(outputs[0].metadata.timestamp);
        let md = render_batch(&outputs, &options);
        assert!(md.contains(&format!(
            "- **Latest Output**: {}",
            latest.format("%Y-%m-%d %H:%M:%S")
        )));
        assert!(!render_batch(&[], &options).contains("Latest Output"));
    }
}

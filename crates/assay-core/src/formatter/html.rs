//! HTML rendering.
//!
//! All output-derived text is escaped before it is placed in markup.

use lazy_static::lazy_static;
use regex::Regex;

use super::escape::{display_title, escape_html};
use super::FormatOptions;
use crate::types::{Content, OutputType, StructuredOutput, ValidationResult};

const DEFAULT_CSS: &str = r#"<style>
.assay-output, .assay-outputs { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
.metadata { background: #f5f5f5; padding: 15px; border-radius: 5px; margin-bottom: 20px; }
.content { line-height: 1.6; margin-bottom: 20px; }
.sections { margin-top: 20px; }
.section { border-left: 3px solid #007cba; padding-left: 15px; margin-bottom: 15px; }
.json-content { background: #f8f8f8; padding: 15px; border-radius: 5px; overflow-x: auto; }
.validation { padding: 10px; border-radius: 5px; }
.validation.valid { background: #d4edda; border: 1px solid #c3e6cb; }
.validation.invalid { background: #f8d7da; border: 1px solid #f5c6cb; }
</style>"#;

lazy_static! {
    static ref MD_HEADING: Regex = Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t]*$").unwrap();
    static ref MD_BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref MD_ITALIC: Regex = Regex::new(r"\*([^*]+?)\*").unwrap();
}

/// A complete HTML document for one or more outputs.
pub(super) fn document(outputs: &[StructuredOutput], options: &FormatOptions, batch: bool) -> String {
    let title = options.title.clone().unwrap_or_else(|| match outputs {
        [single] if !batch => format!("Output from {}", single.metadata.producer_role),
        _ => "Execution Results".to_string(),
    });

    let mut parts = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".to_string(),
        "<head>".to_string(),
        "<meta charset=\"utf-8\">".to_string(),
        format!("<title>{}</title>", escape_html(&title)),
    ];
    if options.include_css {
        parts.push(DEFAULT_CSS.to_string());
    }
    parts.push("</head>".to_string());
    parts.push("<body>".to_string());

    if batch {
        parts.push("<div class=\"assay-outputs\">".to_string());
        parts.push(format!("<h1>{}</h1>", escape_html(&title)));
        for (i, output) in outputs.iter().enumerate() {
            parts.push(format!("<div class=\"output-item\" data-index=\"{}\">", i));
            parts.push(format!(
                "<h2>Output {}: {}</h2>",
                i + 1,
                escape_html(&output.metadata.producer_role)
            ));
            parts.push(output_body(output, options));
            parts.push("</div>".to_string());
        }
        parts.push("</div>".to_string());
    } else {
        for output in outputs {
            parts.push(output_body(output, options));
        }
    }

    parts.push("</body>".to_string());
    parts.push("</html>".to_string());
    parts.join("\n")
}

fn output_body(output: &StructuredOutput, options: &FormatOptions) -> String {
    let mut parts = vec![format!(
        "<div class=\"assay-output\" data-id=\"{}\">",
        escape_html(&output.id)
    )];

    if options.include_metadata {
        parts.push(metadata_block(output));
    }

    let content = match (&output.output_type, &output.content) {
        (OutputType::Markdown, Content::Text(text)) => markdown_to_html(text),
        (_, Content::Text(text)) => {
            format!("<div class=\"text-content\">{}</div>", escape_html(text))
        }
        (_, structured) => {
            let pretty = serde_json::to_string_pretty(&structured.to_value())
                .unwrap_or_else(|_| structured.to_text().into_owned());
            format!("<pre class=\"json-content\">{}</pre>", escape_html(&pretty))
        }
    };
    parts.push(format!("<div class=\"content\">{}</div>", content));

    if !output.sections.is_empty() {
        parts.push("<div class=\"sections\">".to_string());
        for (name, body) in output.sections.iter() {
            parts.push(format!(
                "<div class=\"section\" data-section=\"{}\">",
                escape_html(name)
            ));
            parts.push(format!("<h3>{}</h3>", escape_html(&display_title(name))));
            parts.push(format!(
                "<div class=\"section-content\">{}</div>",
                escape_html(body)
            ));
            parts.push("</div>".to_string());
        }
        parts.push("</div>".to_string());
    }

    if let Some(validation) = &output.validation {
        parts.push(validation_block(validation));
    }

    parts.push("</div>".to_string());
    parts.join("\n")
}

fn metadata_block(output: &StructuredOutput) -> String {
    let meta = &output.metadata;
    let mut items = vec![
        ("Producer", escape_html(&meta.producer_role)),
        ("Status", output.status.to_string()),
        ("Type", output.output_type.to_string()),
        ("Timestamp", meta.timestamp.to_rfc3339()),
    ];
    if let Some(task) = &meta.task_name {
        items.push(("Task", escape_html(task)));
    }
    if meta.word_count > 0 {
        items.push(("Word Count", meta.word_count.to_string()));
    }
    if let Some(elapsed) = meta.execution_time {
        items.push(("Execution Time", format!("{:.2}s", elapsed.as_secs_f64())));
    }

    let mut parts = vec![
        "<div class=\"metadata\">".to_string(),
        "<h3>Output Metadata</h3>".to_string(),
        "<ul>".to_string(),
    ];
    for (label, value) in items {
        parts.push(format!("<li><strong>{}:</strong> {}</li>", label, value));
    }
    parts.push("</ul>".to_string());
    parts.push("</div>".to_string());
    parts.join("\n")
}

fn validation_block(validation: &ValidationResult) -> String {
    let class = if validation.is_valid { "valid" } else { "invalid" };
    let mut parts = vec![
        format!("<div class=\"validation {}\">", class),
        "<h3>Validation Results</h3>".to_string(),
        format!("<p><strong>Valid:</strong> {}</p>", validation.is_valid),
        format!(
            "<p><strong>Score:</strong> {:.1}%</p>",
            validation.validation_score * 100.0
        ),
    ];

    for (label, messages) in [("Errors", &validation.errors), ("Warnings", &validation.warnings)] {
        if messages.is_empty() {
            continue;
        }
        parts.push(format!("<p><strong>{}:</strong></p>", label));
        parts.push("<ul>".to_string());
        for message in messages {
            parts.push(format!("<li>{}</li>", escape_html(message)));
        }
        parts.push("</ul>".to_string());
    }

    parts.push("</div>".to_string());
    parts.join("\n")
}

/// Minimal markdown rendering: headings, bold and italics. Escapes first.
pub(super) fn markdown_to_html(text: &str) -> String {
    escape_html(text)
        .lines()
        .map(|line| match MD_HEADING.captures(line) {
            Some(caps) => {
                let level = caps[1].len();
                format!("<h{0}>{1}</h{0}>", level, inline(&caps[2]))
            }
            None => format!("{}<br>", inline(line)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline(line: &str) -> String {
    let bold = MD_BOLD.replace_all(line, "<strong>$1</strong>");
    MD_ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

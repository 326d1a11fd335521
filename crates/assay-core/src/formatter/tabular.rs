//! Row-oriented renderings: CSV tables and one-line summaries.

use std::io;

use super::{FormatError, FormatOptions};
use crate::types::{truncate_chars, StructuredOutput};

pub(super) const CSV_HEADER: [&str; 7] = [
    "id",
    "producer",
    "status",
    "word_count",
    "score",
    "timestamp",
    "preview",
];

const SUMMARY_PREVIEW_CHARS: usize = 100;
const RULE: &str = "==================================================";

/// Header plus one row per output.
pub(super) fn csv_table(
    outputs: &[StructuredOutput],
    options: &FormatOptions,
) -> Result<String, FormatError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for output in outputs {
        let score = output
            .validation_score()
            .map(|s| format!("{:.3}", s))
            .unwrap_or_default();
        let word_count = output.metadata.word_count.to_string();
        let timestamp = output.metadata.timestamp.to_rfc3339();
        let preview = output.content_preview(options.preview_length);
        writer.write_record([
            output.id.as_str(),
            output.metadata.producer_role.as_str(),
            output.status.as_str(),
            word_count.as_str(),
            score.as_str(),
            timestamp.as_str(),
            preview.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::Csv(csv::Error::from(e.into_error())))?;
    String::from_utf8(bytes)
        .map_err(|e| FormatError::Csv(csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e))))
}

/// `Producer: R | Status: success | Time: ... | Words: n | Validation: 92.3% | Preview: ...`
pub(super) fn summary_line(output: &StructuredOutput) -> String {
    let meta = &output.metadata;
    let mut parts = vec![
        format!("Producer: {}", meta.producer_role),
        format!("Status: {}", output.status),
        format!("Time: {}", meta.timestamp.format("%Y-%m-%d %H:%M:%S")),
    ];
    if meta.word_count > 0 {
        parts.push(format!("Words: {}", meta.word_count));
    }
    if let Some(score) = output.validation_score() {
        parts.push(format!("Validation: {:.1}%", score * 100.0));
    }
    let preview = truncate_chars(&output.content.to_text(), SUMMARY_PREVIEW_CHARS);
    parts.push(format!("Preview: {}", preview.replace('\n', " ")));
    parts.join(" | ")
}

pub(super) fn summary_table(outputs: &[StructuredOutput]) -> String {
    let mut lines = vec!["EXECUTION SUMMARY".to_string(), RULE.to_string()];
    for (i, output) in outputs.iter().enumerate() {
        lines.push(format!("{:2}. {}", i + 1, summary_line(output)));
    }
    lines.push(RULE.to_string());
    lines.push(format!("Total: {} outputs", outputs.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{Attribution, OutputProcessor};

    fn batch() -> Vec<StructuredOutput> {
        let processor = OutputProcessor::new();
        vec![
            processor.process_agent_output("Line one, with \"quotes\"\nand a newline", Attribution::new("a", "Researcher")),
            processor.process_agent_output("x".repeat(300), Attribution::new("b", "Writer")),
            processor.process_agent_output("", Attribution::new("c", "Critic")),
        ]
    }

    #[test]
    fn test_csv_has_header_and_row_per_output() {
        let outputs = batch();
        let text = csv_table(&outputs, &FormatOptions::default()).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), outputs.len());
        assert_eq!(&rows[0][1], "Researcher");
        assert!(rows[0][6].contains("\"quotes\""));
        assert_eq!(rows[1][6].chars().count(), 203);
        assert_eq!(&rows[2][2], "failed");
    }

    #[test]
    fn test_csv_preview_length() {
        let outputs = batch();
        let options = FormatOptions {
            preview_length: 10,
            ..FormatOptions::default()
        };
        let text = csv_table(&outputs[1..2], &options).unwrap();
        assert!(text.contains(&format!("{}...", "x".repeat(10))));
    }

    #[test]
    fn test_summary_line() {
        let line = summary_line(&batch()[0]);
        assert!(line.starts_with("Producer: Researcher | Status: success"));
        assert!(line.contains("Words: 7"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_summary_table() {
        let table = summary_table(&batch());
        assert!(table.starts_with("EXECUTION SUMMARY\n"));
        assert!(table.contains(" 3. Producer: Critic"));
        assert!(table.ends_with("Total: 3 outputs"));
    }
}

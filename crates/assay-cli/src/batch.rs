//! Batch and config files read by the CLI.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use assay_core::{Attribution, BatchItem, OutputSchema, PipelineConfig, RawOutput};

/// One entry of a batch file.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub producer_id: Option<String>,
    #[serde(default)]
    pub producer_role: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub output: serde_json::Value,
}

impl BatchEntry {
    /// Entries naming neither producer get the processor's placeholder
    /// attribution.
    fn into_item(self, index: usize) -> BatchItem {
        let raw = RawOutput::from(self.output);
        if self.producer_id.is_none() && self.producer_role.is_none() {
            return BatchItem::new(raw);
        }

        let mut attribution = Attribution::new(
            self.producer_id.unwrap_or_else(|| format!("agent_{}", index)),
            self.producer_role.unwrap_or_else(|| "Unknown".to_string()),
        );
        if let Some(task_name) = self.task_name {
            attribution = attribution.with_task_name(task_name);
        }
        BatchItem::attributed(raw, attribution)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Parse batch text; JSON when `json` is set, YAML otherwise.
pub fn parse_batch(text: &str, json: bool) -> Result<Vec<BatchItem>> {
    let entries: Vec<BatchEntry> = if json {
        serde_json::from_str(text).context("Batch is not a JSON list of entries")?
    } else {
        serde_yaml::from_str(text).context("Batch is not a YAML list of entries")?
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_item(index))
        .collect())
}

pub fn load_batch(path: &Path) -> Result<Vec<BatchItem>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    parse_batch(&text, is_json(path))
        .with_context(|| format!("Failed to parse batch file {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let config = if is_json(path) {
        PipelineConfig::from_json_file(path)
    } else {
        PipelineConfig::from_yaml_file(path)
    };
    config.with_context(|| format!("Failed to load config {}", path.display()))
}

pub fn load_schema(path: &Path) -> Result<OutputSchema> {
    let schema = if is_json(path) {
        OutputSchema::from_json_file(path)
    } else {
        OutputSchema::from_yaml_file(path)
    };
    schema.with_context(|| format!("Failed to load schema {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_batch() {
        let yaml = r##"
- producer_id: r1
  producer_role: Researcher
  task_name: Market scan
  output: "# Findings\n\nDemand is up."
- output:
    summary: done
- producer_role: Writer
  output: draft
"##;
        let items = parse_batch(yaml, false).unwrap();
        assert_eq!(items.len(), 3);

        let first = items[0].attribution.as_ref().unwrap();
        assert_eq!(first.producer_id, "r1");
        assert_eq!(first.task_name.as_deref(), Some("Market scan"));
        assert!(matches!(items[1].raw, RawOutput::Mapping(_)));
        assert!(items[1].attribution.is_none());

        let third = items[2].attribution.as_ref().unwrap();
        assert_eq!(third.producer_id, "agent_2");
        assert_eq!(third.producer_role, "Writer");
    }

    #[test]
    fn test_json_batch_missing_output_is_null() {
        let items = parse_batch(r#"[{"producer_id": "x"}]"#, true).unwrap();
        assert!(items[0].raw.is_blank());
    }

    #[test]
    fn test_invalid_batch() {
        assert!(parse_batch("{\"not\": \"a list\"}", true).is_err());
    }

    #[test]
    fn test_extension_detection() {
        assert!(is_json(Path::new("batch.JSON")));
        assert!(!is_json(Path::new("batch.yaml")));
        assert!(!is_json(Path::new("batch")));
    }

    #[test]
    fn test_demo_files_load() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");

        let items = load_batch(&demos.join("batch.yaml")).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[2].raw.is_blank());

        let config = load_config(Some(&demos.join("config.yaml"))).unwrap();
        assert_eq!(config.processor.keyword_limit, 10);
        assert_eq!(config.validator.min_content_length, 20);

        let schema = load_schema(&demos.join("schema.yaml")).unwrap();
        assert_eq!(schema.name, "research_report");
        assert!(load_config(None).is_ok());
    }
}

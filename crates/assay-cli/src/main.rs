//! `assay`: normalize, validate, render and aggregate batches of producer
//! outputs from the command line.
//!
//! Usage:
//!   assay process batch.yaml --format html --aggregate
//!   assay process batch.json --schema report.yaml --strict --workflow-id wf-1
//!   assay report batch.yaml --workflow-name "Market research" --consolidate merge --role Editor
//!   assay report batch.yaml --workflow-name Research --compare validation_score,word_count
//!
//! Documents go to stdout, logs to stderr (`RUST_LOG`, default `info`).

mod batch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use assay_core::aggregator::parse_criteria;
use assay_core::{
    ConsolidationStrategy, Pipeline, StructuredOutput, TargetFormat, ValidationOptions,
};
use assay_runtime::{BatchPipeline, RuntimeConfig};

#[derive(Parser)]
#[command(name = "assay")]
#[command(about = "Normalize, validate and render agent outputs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process and validate a batch, then render it
    Process {
        #[command(flatten)]
        common: CommonArgs,

        /// json, html, markdown, csv, xml, summary or template
        #[arg(short, long, default_value = "json")]
        format: TargetFormat,

        /// Render one combined document instead of one per output
        #[arg(long)]
        aggregate: bool,

        /// Template name for the template format
        #[arg(long)]
        template: Option<String>,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Process a batch and print workflow analytics as JSON
    Report {
        #[command(flatten)]
        common: CommonArgs,

        /// Human-readable workflow name
        #[arg(long)]
        workflow_name: String,

        /// Consolidate outputs with merge, summary or best
        #[arg(long)]
        consolidate: Option<ConsolidationStrategy>,

        /// Producer role of the consolidated output
        #[arg(long, default_value = "Consolidator")]
        role: String,

        /// Comma-separated comparison criteria (empty for the defaults)
        #[arg(long)]
        compare: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Batch file (YAML, or JSON when it ends in .json)
    batch: PathBuf,

    /// Pipeline config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output schema to validate against
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Treat validation warnings as errors
    #[arg(long)]
    strict: bool,

    /// Workflow id stamped on every output
    #[arg(long)]
    workflow_id: Option<String>,

    /// Items processed concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

impl CommonArgs {
    /// Load everything, run the batch and return validated outputs.
    async fn run(&self) -> Result<(Pipeline, Vec<StructuredOutput>)> {
        let config = batch::load_config(self.config.as_deref())?;
        let items = batch::load_batch(&self.batch)?;

        let mut options = match &self.schema {
            Some(path) => ValidationOptions::with_schema(&batch::load_schema(path)?),
            None => ValidationOptions::new(),
        };
        if self.strict {
            options = options.strict();
        }

        let runtime_config = match self.concurrency {
            Some(n) => RuntimeConfig::with_max_concurrency(n),
            None => RuntimeConfig::default(),
        };
        let runtime = BatchPipeline::new(Pipeline::from_config(&config), runtime_config)
            .context("Invalid runtime settings")?;

        let outputs = runtime
            .run(items, self.workflow_id.as_deref(), options)
            .await
            .context("Batch execution failed")?;
        Ok((runtime.pipeline().clone(), outputs))
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            common,
            format,
            aggregate,
            template,
            title,
        } => {
            let (pipeline, outputs) = common.run().await?;

            let mut options = pipeline.formatter.default_options();
            if let Some(name) = template {
                options = options.with_template(name);
            }
            if let Some(title) = title {
                options = options.with_title(title);
            }

            let documents = pipeline
                .formatter
                .format_multiple_outputs(&outputs, format, aggregate, &options)
                .with_context(|| format!("Failed to render {} output", format))?;
            tracing::info!(
                outputs = outputs.len(),
                documents = documents.len(),
                format = %format,
                "Rendered batch"
            );
            for document in documents {
                println!("{}", document);
            }
        }

        Commands::Report {
            common,
            workflow_name,
            consolidate,
            role,
            compare,
        } => {
            let (pipeline, outputs) = common.run().await?;
            let workflow_id = common.workflow_id.as_deref().unwrap_or("workflow");

            let result = pipeline
                .aggregator
                .aggregate_workflow_results(&outputs, workflow_id, &workflow_name, None, None)
                .context("Failed to aggregate workflow")?;

            let consolidated = consolidate
                .map(|strategy| {
                    pipeline
                        .aggregator
                        .create_consolidated_output(&outputs, strategy, &role)
                })
                .transpose()
                .context("Failed to consolidate outputs")?;

            let comparison = match compare {
                Some(list) => {
                    let criteria = parse_criteria(&list)?;
                    Some(pipeline.aggregator.generate_comparison_report(&outputs, &criteria))
                }
                None => None,
            };

            let report = json!({
                "summary": result.summary(),
                "analytics": result.analytics,
                "insights": result.insights,
                "consolidated": consolidated,
                "comparison": comparison,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        }
    }

    Ok(())
}

//! Bounded fan-out of batch work onto the blocking pool.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use assay_core::processor::failed_output;
use assay_core::validator::panic_message;
use assay_core::{
    Attribution, BatchItem, Pipeline, StructuredOutput, ValidationOptions, ValidationResult,
};

use crate::config::RuntimeConfig;
use crate::RuntimeError;

/// Runs the pipeline stages over a batch with bounded parallelism.
///
/// Results always come back in input order, one per item.
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    pipeline: Arc<Pipeline>,
    limiter: Arc<Semaphore>,
    config: RuntimeConfig,
}

impl BatchPipeline {
    pub fn new(pipeline: Pipeline, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            limiter: Arc::new(Semaphore::new(config.max_concurrency)),
            config,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Process every item. A `workflow_id` overrides the one in each item's
    /// attribution.
    pub async fn process_batch(
        &self,
        items: Vec<BatchItem>,
        workflow_id: Option<&str>,
    ) -> Result<Vec<StructuredOutput>, RuntimeError> {
        let jobs: Vec<(BatchItem, Attribution)> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let mut attribution = item
                    .attribution
                    .clone()
                    .unwrap_or_else(|| Attribution::placeholder(index));
                if let Some(id) = workflow_id {
                    attribution.workflow_id = Some(id.to_string());
                }
                (item, attribution)
            })
            .collect();
        let fallbacks: Vec<Attribution> = jobs.iter().map(|(_, a)| a.clone()).collect();

        let pipeline = Arc::clone(&self.pipeline);
        let outputs = self
            .fan_out(
                jobs,
                move |(item, attribution)| {
                    pipeline.processor.process_agent_output(item.raw, attribution)
                },
                |index, reason| {
                    let metadata = fallbacks[index].clone().into_metadata();
                    failed_output(metadata, &format!("Processing panicked: {}", reason))
                },
            )
            .await?;

        tracing::info!(
            workflow_id = workflow_id.unwrap_or("-"),
            total = outputs.len(),
            max_concurrency = self.config.max_concurrency,
            "Processed batch concurrently"
        );
        Ok(outputs)
    }

    /// Validate every output independently.
    pub async fn validate_batch(
        &self,
        outputs: Vec<StructuredOutput>,
        options: ValidationOptions,
    ) -> Result<Vec<ValidationResult>, RuntimeError> {
        let pipeline = Arc::clone(&self.pipeline);
        let options = Arc::new(options);
        self.fan_out(
            outputs,
            move |output| pipeline.validator.validate_output(&output, &options),
            |_, reason| ValidationResult {
                is_valid: false,
                validation_score: 0.0,
                errors: vec![format!("validation panicked: {}", reason)],
                warnings: Vec::new(),
                rules_evaluated: Vec::new(),
            },
        )
        .await
    }

    /// Process and validate a batch, returning outputs with their validation
    /// attached.
    pub async fn run(
        &self,
        items: Vec<BatchItem>,
        workflow_id: Option<&str>,
        options: ValidationOptions,
    ) -> Result<Vec<StructuredOutput>, RuntimeError> {
        let outputs = self.process_batch(items, workflow_id).await?;
        let validations = self.validate_batch(outputs.clone(), options).await?;

        Ok(outputs
            .into_iter()
            .zip(validations)
            .map(|(mut output, validation)| {
                output.validation = Some(validation);
                output
            })
            .collect())
    }

    async fn fan_out<T, R, F, P>(
        &self,
        items: Vec<T>,
        work: F,
        on_panic: P,
    ) -> Result<Vec<R>, RuntimeError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
        P: Fn(usize, String) -> R,
    {
        let work = Arc::new(work);

        let tasks = items.into_iter().map(|item| {
            let limiter = Arc::clone(&self.limiter);
            let work = Arc::clone(&work);
            async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| RuntimeError::LimiterClosed)?;
                Ok::<_, RuntimeError>(tokio::task::spawn_blocking(move || work(item)).await)
            }
        });

        join_all(tasks)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, joined)| match joined? {
                Ok(result) => Ok(result),
                Err(e) => {
                    let reason = join_failure(e);
                    tracing::warn!(index, reason = %reason, "Batch item panicked");
                    Ok(on_panic(index, reason))
                }
            })
            .collect()
    }
}

fn join_failure(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(&*error.into_panic())
    } else {
        "task cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::{OutputStatus, OutputType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn runtime(limit: usize) -> BatchPipeline {
        BatchPipeline::new(Pipeline::default(), RuntimeConfig::with_max_concurrency(limit)).unwrap()
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(matches!(
            BatchPipeline::new(Pipeline::default(), RuntimeConfig::with_max_concurrency(0)),
            Err(RuntimeError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let items: Vec<BatchItem> = (0..12)
            .map(|i| BatchItem::new(format!("output number {} with several words", i)))
            .collect();
        let outputs = runtime(3).process_batch(items, Some("wf-order")).await.unwrap();

        assert_eq!(outputs.len(), 12);
        for (i, output) in outputs.iter().enumerate() {
            assert_eq!(output.metadata.producer_id, format!("agent_{}", i));
            assert!(output.content.to_text().contains(&format!("number {} ", i)));
            assert_eq!(output.metadata.workflow_id.as_deref(), Some("wf-order"));
        }
    }

    #[tokio::test]
    async fn test_matches_sequential_processing() {
        let items = vec![
            BatchItem::attributed("# Title\n\n## Part\nBody text", Attribution::new("a", "Writer")),
            BatchItem::new(""),
            BatchItem::new("{\"k\": 1}"),
        ];
        let outputs = runtime(2).process_batch(items, None).await.unwrap();

        assert_eq!(outputs[0].output_type, OutputType::Markdown);
        assert_eq!(outputs[1].status, OutputStatus::Failed);
        assert_eq!(outputs[2].output_type, OutputType::Json);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

        let results = runtime(2)
            .fan_out(
                (0..8).collect::<Vec<usize>>(),
                move |i: usize| {
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    a.fetch_sub(1, Ordering::SeqCst);
                    i * 10
                },
                |_, _| usize::MAX,
            )
            .await
            .unwrap();

        assert_eq!(results, (0..8).map(|i| i * 10).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_item_is_isolated() {
        let results = runtime(4)
            .fan_out(
                vec![1, 2, 3],
                |i: i32| {
                    if i == 2 {
                        panic!("boom on {}", i);
                    }
                    format!("ok {}", i)
                },
                |index, reason| format!("failed {}: {}", index, reason),
            )
            .await
            .unwrap();

        assert_eq!(results, vec!["ok 1", "failed 1: boom on 2", "ok 3"]);
    }

    #[tokio::test]
    async fn test_run_attaches_validation() {
        let items = vec![
            BatchItem::new("A reasonably long piece of plain text output."),
            BatchItem::new("   "),
        ];
        let outputs = runtime(2)
            .run(items, Some("wf"), ValidationOptions::new())
            .await
            .unwrap();

        assert!(outputs[0].validation.as_ref().unwrap().is_valid);
        assert!(outputs[1].validation.is_some());
        assert_eq!(outputs[1].status, OutputStatus::Failed);
    }
}

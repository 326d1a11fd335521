//! # assay-runtime
//!
//! Concurrent batch execution for the assay pipeline.
//!
//! `assay-core` is synchronous. This crate fans a batch out over tokio's
//! blocking pool, bounded by a semaphore, and fans the results back in
//! input order. A panic while handling one item turns that item into a
//! failed output; its siblings are unaffected.
//!
//! ## Example
//!
//! ```rust,ignore
//! use assay_core::{BatchItem, Pipeline};
//! use assay_runtime::{BatchPipeline, RuntimeConfig};
//!
//! let runtime = BatchPipeline::new(Pipeline::default(), RuntimeConfig::default())?;
//! let outputs = runtime
//!     .process_batch(vec![BatchItem::new("first"), BatchItem::new("second")], Some("wf-1"))
//!     .await?;
//! ```

mod config;
mod pipeline;

pub use config::RuntimeConfig;
pub use pipeline::BatchPipeline;

use thiserror::Error;

/// Errors from the batch runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid runtime configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Concurrency limiter closed")]
    LimiterClosed,
}

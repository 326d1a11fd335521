//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// Settings for [`crate::BatchPipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Items processed at the same time
    pub max_concurrency: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl RuntimeConfig {
    pub fn with_max_concurrency(max_concurrency: usize) -> Self {
        Self { max_concurrency }
    }

    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.max_concurrency == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

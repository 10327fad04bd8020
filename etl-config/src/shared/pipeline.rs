use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, ValidationError};

/// Worker counts, queue capacities, and limits for one pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Number of extractors; the key space is split into this many ranges.
    #[serde(default = "default_extractor_workers")]
    pub extractor_workers: u16,
    #[serde(default = "default_transformer_workers")]
    pub transformer_workers: u16,
    #[serde(default = "default_loader_workers")]
    pub loader_workers: u16,
    /// Maximum rows returned by one extraction query.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Capacity of the queue between extractors and transformers.
    #[serde(default = "default_queue_capacity")]
    pub extract_queue_capacity: usize,
    /// Capacity of the queue between transformers and loaders.
    #[serde(default = "default_queue_capacity")]
    pub transform_queue_capacity: usize,
    #[serde(default)]
    pub batch: BatchConfig,
    /// Overall deadline for the run. `None` runs until completion.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PipelineConfig {
    pub const DEFAULT_EXTRACTOR_WORKERS: u16 = 4;
    pub const DEFAULT_TRANSFORMER_WORKERS: u16 = 4;
    pub const DEFAULT_LOADER_WORKERS: u16 = 2;
    pub const DEFAULT_PAGE_SIZE: u32 = 5_000;
    pub const DEFAULT_QUEUE_CAPACITY: usize = 5_000;

    /// Validates pipeline settings.
    ///
    /// Every worker count, capacity and size must be non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_zero("pipeline.extractor_workers", self.extractor_workers as u64)?;
        non_zero(
            "pipeline.transformer_workers",
            self.transformer_workers as u64,
        )?;
        non_zero("pipeline.loader_workers", self.loader_workers as u64)?;
        non_zero("pipeline.page_size", self.page_size as u64)?;
        non_zero(
            "pipeline.extract_queue_capacity",
            self.extract_queue_capacity as u64,
        )?;
        non_zero(
            "pipeline.transform_queue_capacity",
            self.transform_queue_capacity as u64,
        )?;

        if self.timeout_ms == Some(0) {
            return Err(ValidationError::InvalidFieldValue {
                field: "pipeline.timeout_ms".to_string(),
                constraint: "must be greater than 0 when set".to_string(),
            });
        }

        self.batch.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor_workers: default_extractor_workers(),
            transformer_workers: default_transformer_workers(),
            loader_workers: default_loader_workers(),
            page_size: default_page_size(),
            extract_queue_capacity: default_queue_capacity(),
            transform_queue_capacity: default_queue_capacity(),
            batch: BatchConfig::default(),
            timeout_ms: None,
        }
    }
}

fn non_zero(field: &str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidFieldValue {
            field: field.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }

    Ok(())
}

fn default_extractor_workers() -> u16 {
    PipelineConfig::DEFAULT_EXTRACTOR_WORKERS
}

fn default_transformer_workers() -> u16 {
    PipelineConfig::DEFAULT_TRANSFORMER_WORKERS
}

fn default_loader_workers() -> u16 {
    PipelineConfig::DEFAULT_LOADER_WORKERS
}

fn default_page_size() -> u32 {
    PipelineConfig::DEFAULT_PAGE_SIZE
}

fn default_queue_capacity() -> usize {
    PipelineConfig::DEFAULT_QUEUE_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();

        assert_eq!(config.extractor_workers, 4);
        assert_eq!(config.transformer_workers, 4);
        assert_eq!(config.loader_workers, 2);
        assert_eq!(config.batch.max_size, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_are_rejected() {
        let config = PipelineConfig {
            loader_workers: 0,
            ..PipelineConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue {
                field: "pipeline.loader_workers".to_string(),
                constraint: "must be greater than 0".to_string(),
            })
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = PipelineConfig {
            timeout_ms: Some(0),
            ..PipelineConfig::default()
        };

        assert!(config.validate().is_err());
    }
}

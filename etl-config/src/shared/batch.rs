use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Number of columns bound per record in a bulk upsert statement.
const BOUND_COLUMNS_PER_RECORD: usize = 5;

/// Maximum number of placeholders MySQL accepts in one prepared statement.
const MAX_STATEMENT_PLACEHOLDERS: usize = 65_535;

/// Loader batching configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Number of records a loader accumulates before issuing one bulk upsert.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
}

impl BatchConfig {
    /// Default bulk flush size.
    pub const DEFAULT_MAX_SIZE: usize = 10_000;

    /// Largest batch whose bulk upsert still fits in a single prepared statement.
    pub const MAX_SIZE_LIMIT: usize = MAX_STATEMENT_PLACEHOLDERS / BOUND_COLUMNS_PER_RECORD;

    /// Validates batch configuration settings.
    ///
    /// Ensures `max_size` is non-zero and small enough to be bound in one statement.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.max_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.max_size > Self::MAX_SIZE_LIMIT {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.max_size".to_string(),
                constraint: format!("must be at most {}", Self::MAX_SIZE_LIMIT),
            });
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}

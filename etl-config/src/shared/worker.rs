use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{MySqlConnectionConfig, PipelineConfig, ValidationError};

/// Maximum identifier length accepted by MySQL.
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Top-level configuration of the `etl-worker` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Database holding the raw event records.
    pub source: MySqlConnectionConfig,
    /// Database receiving the transformed records.
    pub target: MySqlConnectionConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config for WorkerConfig {
    const NAME: &'static str = "worker configuration";
}

impl WorkerConfig {
    /// Validates the whole configuration, including that each pool can serve every worker
    /// that holds one of its connections concurrently.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate("source")?;
        self.target.validate("target")?;
        self.tables.validate()?;
        self.pipeline.validate()?;

        let extractors = self.pipeline.extractor_workers as u32;
        if self.source.max_connections < extractors {
            return Err(ValidationError::PoolTooSmall {
                field: "source.max_connections".to_string(),
                max_connections: self.source.max_connections,
                required: extractors,
            });
        }

        let loaders = self.pipeline.loader_workers as u32;
        if self.target.max_connections < loaders {
            return Err(ValidationError::PoolTooSmall {
                field: "target.max_connections".to_string(),
                max_connections: self.target.max_connections,
                required: loaders,
            });
        }

        Ok(())
    }
}

/// Names of the tables read from and written to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TablesConfig {
    #[serde(default = "default_source_table")]
    pub source_table: String,
    #[serde(default = "default_target_table")]
    pub target_table: String,
}

impl TablesConfig {
    pub const DEFAULT_SOURCE_TABLE: &'static str = "raw_records";
    pub const DEFAULT_TARGET_TABLE: &'static str = "records";

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("tables.source_table", &self.source_table)?;
        validate_identifier("tables.target_table", &self.target_table)
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            source_table: default_source_table(),
            target_table: default_target_table(),
        }
    }
}

fn validate_identifier(field: &str, value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(ValidationError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

fn default_source_table() -> String {
    TablesConfig::DEFAULT_SOURCE_TABLE.to_string()
}

fn default_target_table() -> String {
    TablesConfig::DEFAULT_TARGET_TABLE.to_string()
}

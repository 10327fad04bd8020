//! MySQL connectivity shared by the etl crates.
//!
//! Builds connection pools from [`etl_config::shared::MySqlConnectionConfig`], quotes
//! identifiers, and owns the DDL of the event tables.

pub mod db;
pub mod schema;
#[cfg(feature = "test-utils")]
pub mod test_utils;

//! Tracing setup for the etl binaries and tests.

pub mod tracing;

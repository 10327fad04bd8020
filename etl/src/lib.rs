//! Concurrent batch ETL for time-windowed event records.
//!
//! A run resolves the key interval of a time window in the source, splits it across
//! extractors, uppercases every message in a transformer pool, and upserts the result into the
//! destination in batches. The stages are connected by bounded queues and share a single
//! cancellation signal, see [`pipeline::Pipeline`].

pub mod concurrency;
pub mod destination;
pub mod error;
pub mod failpoints;
mod macros;
pub mod partition;
pub mod pipeline;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transform;
pub mod types;
pub mod workers;

//! Stores the pipeline writes records to.
//!
//! Writes are bulk upserts keyed on the record's business key, so replaying a batch leaves the
//! target unchanged.

mod base;
pub mod memory;
pub mod mysql;

pub use base::Destination;

//! Stores the pipeline reads records from.
//!
//! A [`Source`] answers two questions: which keys a time window spans, and which records follow
//! a cursor inside one key range.

mod base;
pub mod memory;
pub mod mysql;

pub use base::Source;

//! Concurrency primitives connecting the pipeline stages.
//!
//! - [`cancel`] carries the run-wide cancellation signal. It is raised at most once and every
//!   blocking operation in the pipeline observes it.
//! - [`queue`] provides the bounded multi-producer multi-consumer queues between stages.
//!   Pushing blocks while a queue is full, which is how slow loaders throttle extraction.

pub mod cancel;
pub mod queue;

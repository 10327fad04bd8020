//! Helpers for testing pipelines against in-memory and MySQL collaborators.

pub mod database;
pub mod failpoints;
pub mod faulty_source;
pub mod notify;
pub mod records;
pub mod test_destination_wrapper;

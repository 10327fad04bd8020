//! Stage workers and the pools that run them.

pub mod base;
pub mod extract;
pub mod failures;
pub mod load;
pub mod pool;
pub mod stats;
pub mod transform;

//! Data types flowing through the pipeline.

mod range;
mod record;
mod window;

pub use range::*;
pub use record::*;
pub use window::*;

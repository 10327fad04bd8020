//! Configuration types shared by the worker binary and the pipeline library.

mod base;
mod batch;
mod connection;
mod pipeline;
mod worker;

pub use base::ValidationError;
pub use batch::BatchConfig;
pub use connection::{IntoConnectOptions, MySqlConnectionConfig, TlsConfig};
pub use pipeline::PipelineConfig;
pub use worker::{TablesConfig, WorkerConfig};

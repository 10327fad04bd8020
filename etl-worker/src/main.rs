//! Batch worker copying one time window of event records from the source database to the
//! target database.
//!
//! Loads configuration, initializes tracing, starts the async runtime and runs a single
//! pipeline. The process exits with a non-zero status when the run fails or is interrupted.

use anyhow::Context;
use clap::Parser;
use etl::types::TimeWindow;
use etl_config::shared::WorkerConfig;
use etl_telemetry::tracing::init_tracing;
use tracing::{error, info};

use crate::cli::Args;
use crate::config::load_worker_config;
use crate::core::start_worker_with_config;

mod cli;
mod config;
mod core;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let worker_config = load_worker_config()?;

    let _log_flusher =
        init_tracing(env!("CARGO_BIN_NAME")).context("failed to initialize tracing")?;

    let window = args.time_window(chrono::Local::now().naive_local())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(worker_config, window))
}

async fn async_main(worker_config: WorkerConfig, window: TimeWindow) -> anyhow::Result<()> {
    match start_worker_with_config(worker_config, window).await {
        Ok(summary) => {
            info!(%summary, "etl worker finished");
            Ok(())
        }
        Err(err) => {
            error!("{err:#}");
            Err(err)
        }
    }
}

use anyhow::Context;
use etl_config::load_config;
use etl_config::shared::WorkerConfig;

/// Loads the worker configuration from `./configuration` and the environment, then validates it.
pub fn load_worker_config() -> anyhow::Result<WorkerConfig> {
    let config =
        load_config::<WorkerConfig>().context("failed to load the worker configuration")?;
    config
        .validate()
        .context("the worker configuration is invalid")?;

    Ok(config)
}

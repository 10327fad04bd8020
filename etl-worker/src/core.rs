use anyhow::Context;
use etl::destination::Destination;
use etl::destination::mysql::MySqlDestination;
use etl::pipeline::{Pipeline, RunSummary};
use etl::source::Source;
use etl::source::mysql::MySqlSource;
use etl::transform::Transform;
use etl::types::TimeWindow;
use etl_config::shared::{MySqlConnectionConfig, PipelineConfig, WorkerConfig};
use etl_mysql::db::connect_pool;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

/// Connects to both databases and runs one pipeline over `window`.
///
/// Returns the run summary when the run succeeds, otherwise the error that stopped it.
pub async fn start_worker_with_config(
    worker_config: WorkerConfig,
    window: TimeWindow,
) -> anyhow::Result<RunSummary> {
    info!(%window, "starting etl worker");

    log_config(&worker_config);

    let source_pool = connect_pool(&worker_config.source)
        .await
        .context("failed to connect to the source database")?;
    let target_pool = connect_pool(&worker_config.target)
        .await
        .context("failed to connect to the target database")?;

    let source = MySqlSource::new(source_pool.clone(), &worker_config.tables.source_table);
    let destination =
        MySqlDestination::new(target_pool.clone(), worker_config.tables.target_table.clone());

    let pipeline = Pipeline::new(worker_config.pipeline, window, source, destination)?;
    let summary = start_pipeline(pipeline).await;

    source_pool.close().await;
    target_pool.close().await;

    Ok(summary.into_result()?)
}

fn log_config(config: &WorkerConfig) {
    log_connection_config("source", &config.source);
    log_connection_config("target", &config.target);
    debug!(
        source_table = config.tables.source_table,
        target_table = config.tables.target_table,
        "tables config"
    );
    log_pipeline_config(&config.pipeline);
}

fn log_connection_config(role: &str, config: &MySqlConnectionConfig) {
    debug!(
        role,
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "mysql connection config"
    );
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(
        extractor_workers = config.extractor_workers,
        transformer_workers = config.transformer_workers,
        loader_workers = config.loader_workers,
        page_size = config.page_size,
        extract_queue_capacity = config.extract_queue_capacity,
        transform_queue_capacity = config.transform_queue_capacity,
        batch_max_size = config.batch.max_size,
        timeout_ms = config.timeout_ms,
        "pipeline config"
    );
}

/// Runs the pipeline, cancelling it on SIGINT or SIGTERM.
///
/// A cancelled run still drains its queues before returning.
#[tracing::instrument(skip(pipeline), fields(run_id = %pipeline.run_id()))]
async fn start_pipeline<S, D, T>(pipeline: Pipeline<S, D, T>) -> RunSummary
where
    S: Source + Clone + Send + Sync + 'static,
    D: Destination + Clone + Send + Sync + 'static,
    T: Transform + Clone + Send + Sync + 'static,
{
    let cancel_tx = pipeline.cancel_tx();
    let shutdown_handle = tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => Some(sigterm),
            Err(err) => {
                warn!(error = %err, "failed to register sigterm handler, only sigint stops the run");
                None
            }
        };

        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, cancelling pipeline run");
            }
            Some(()) = recv_sigterm(&mut sigterm) => {
                info!("sigterm received, cancelling pipeline run");
            }
            else => {
                warn!("no shutdown signal can be received, the run can only end on its own");
                return;
            }
        }

        cancel_tx.cancel();
    });

    let summary = pipeline.run().await;

    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    summary
}

async fn recv_sigterm(sigterm: &mut Option<tokio::signal::unix::Signal>) -> Option<()> {
    match sigterm {
        Some(sigterm) => sigterm.recv().await,
        None => std::future::pending().await,
    }
}

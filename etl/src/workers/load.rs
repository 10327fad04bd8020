use tracing::{info, warn};

use crate::concurrency::cancel::CancelRx;
use crate::concurrency::queue::{Pop, QueueRx};
use crate::destination::Destination;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::failpoints::{LOAD_BEFORE_FLUSH, etl_fail_point};
use crate::types::Record;
use crate::workers::base::{Worker, WorkerType};
use crate::workers::failures::{FailureOrigin, FailureTracker};
use crate::workers::stats::RunStats;
use crate::{bail, etl_error};

/// Accumulates records from the load queue and writes them in fixed-size batches.
///
/// A batch is flushed when it reaches `batch_size` and once more, possibly partial, when the
/// queue is drained. A failed flush is reported and its records are dropped; the worker itself
/// keeps going until the run is cancelled. On cancellation the partial batch is discarded, and
/// so is a batch whose write is still in flight.
#[derive(Debug)]
pub struct LoadWorker<D> {
    id: u16,
    destination: D,
    input: QueueRx<Record>,
    batch_size: usize,
    stats: RunStats,
    tracker: FailureTracker,
    cancel_rx: CancelRx,
}

impl<D> LoadWorker<D> {
    pub fn new(
        id: u16,
        destination: D,
        input: QueueRx<Record>,
        batch_size: usize,
        stats: RunStats,
        tracker: FailureTracker,
        cancel_rx: CancelRx,
    ) -> Self {
        Self {
            id,
            destination,
            input,
            batch_size: batch_size.max(1),
            stats,
            tracker,
            cancel_rx,
        }
    }
}

impl<D> LoadWorker<D>
where
    D: Destination + Send + Sync + 'static,
{
    /// Writes the batch, leaving an empty one with the same capacity in its place.
    ///
    /// Fails only when the run is cancelled while the write is in flight.
    async fn flush(&mut self, batch: &mut Vec<Record>) -> EtlResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let worker = WorkerType::Loader { id: self.id };
        let records = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        let batch_size = records.len();

        let result = match etl_fail_point(LOAD_BEFORE_FLUSH) {
            Ok(()) => tokio::select! {
                biased;

                _ = self.cancel_rx.cancelled() => {
                    warn!(%worker, discarded = batch_size, "discarding in-flight batch after cancellation");
                    bail!(ErrorKind::Cancelled, "Load cancelled");
                }
                result = self.destination.bulk_upsert(records) => result,
            },
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.stats.batch_flushed(batch_size);
                info!(%worker, destination = D::name(), batch_size, "flushed batch");
            }
            Err(err) => {
                self.stats.batch_failed();
                self.tracker
                    .report(FailureOrigin::Worker(worker), load_failure(worker, batch_size, err));
            }
        }

        Ok(())
    }
}

fn load_failure(worker: WorkerType, batch_size: usize, err: EtlError) -> EtlError {
    etl_error!(
        ErrorKind::LoadFailure,
        "Batch load failed",
        format!(
            "worker {worker}, batch size {batch_size}, cause: [{:?}] {}",
            err.kind(),
            err.description()
        ),
        source: err
    )
}

impl<D> Worker for LoadWorker<D>
where
    D: Destination + Send + Sync + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::Loader { id: self.id }
    }

    async fn run(mut self) -> EtlResult<()> {
        let worker = self.worker_type();
        let mut batch = Vec::with_capacity(self.batch_size);

        loop {
            match self.input.pop().await {
                Pop::Item(record) => {
                    batch.push(record);
                    if batch.len() >= self.batch_size {
                        self.flush(&mut batch).await?;
                    }
                }
                Pop::Drained => {
                    self.flush(&mut batch).await?;
                    info!(%worker, "load completed");
                    return Ok(());
                }
                Pop::Cancelled => {
                    if !batch.is_empty() {
                        warn!(%worker, discarded = batch.len(), "discarding partial batch after cancellation");
                    }
                    bail!(ErrorKind::Cancelled, "Load cancelled");
                }
            }
        }
    }
}

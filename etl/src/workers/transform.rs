use tracing::info;

use crate::concurrency::queue::{Pop, QueueRx, QueueTx};
use crate::error::{ErrorKind, EtlResult};
use crate::failpoints::{TRANSFORM_BEFORE_PUSH, etl_fail_point};
use crate::transform::Transform;
use crate::types::Record;
use crate::workers::base::{Worker, WorkerType};
use crate::workers::stats::RunStats;
use crate::bail;

/// Moves records from the extract queue to the load queue, transforming each one.
#[derive(Debug)]
pub struct TransformWorker<T> {
    id: u16,
    transform: T,
    input: QueueRx<Record>,
    output: QueueTx<Record>,
    stats: RunStats,
}

impl<T> TransformWorker<T> {
    pub fn new(
        id: u16,
        transform: T,
        input: QueueRx<Record>,
        output: QueueTx<Record>,
        stats: RunStats,
    ) -> Self {
        Self {
            id,
            transform,
            input,
            output,
            stats,
        }
    }
}

impl<T> Worker for TransformWorker<T>
where
    T: Transform + Send + Sync + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::Transformer { id: self.id }
    }

    async fn run(mut self) -> EtlResult<()> {
        let worker = self.worker_type();
        let mut transformed = 0u64;

        loop {
            match self.input.pop().await {
                Pop::Item(record) => {
                    let record = self.transform.apply(record);
                    etl_fail_point(TRANSFORM_BEFORE_PUSH)?;
                    self.output.push(record).await?;
                    self.stats.record_transformed();
                    transformed += 1;
                }
                Pop::Drained => {
                    info!(%worker, transform = self.transform.name(), transformed, "transformation completed");
                    return Ok(());
                }
                Pop::Cancelled => {
                    info!(%worker, transformed, "transformation cancelled");
                    bail!(ErrorKind::Cancelled, "Transformation cancelled");
                }
            }
        }
    }
}

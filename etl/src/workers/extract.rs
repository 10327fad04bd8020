use tracing::info;

use crate::concurrency::cancel::CancelRx;
use crate::concurrency::queue::QueueTx;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::failpoints::{EXTRACT_BEFORE_PAGE, etl_fail_point};
use crate::source::Source;
use crate::types::{KeyRange, Record, TimeWindow};
use crate::workers::base::{Worker, WorkerType};
use crate::workers::stats::RunStats;
use crate::{bail, etl_error};

/// Reads one key range page by page and feeds the records to the extract queue.
///
/// Pagination is keyset based: each page asks for keys strictly greater than the last key
/// seen, so a page never repeats or skips a record even when rows in the range are outside the
/// time window.
#[derive(Debug)]
pub struct ExtractWorker<S> {
    id: u16,
    source: S,
    range: KeyRange,
    window: TimeWindow,
    page_size: u32,
    queue: QueueTx<Record>,
    stats: RunStats,
    cancel_rx: CancelRx,
}

impl<S> ExtractWorker<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u16,
        source: S,
        range: KeyRange,
        window: TimeWindow,
        page_size: u32,
        queue: QueueTx<Record>,
        stats: RunStats,
        cancel_rx: CancelRx,
    ) -> Self {
        Self {
            id,
            source,
            range,
            window,
            page_size,
            queue,
            stats,
            cancel_rx,
        }
    }

    fn failure(&self, cursor: i64, err: EtlError) -> EtlError {
        etl_error!(
            ErrorKind::ExtractFailure,
            "Extraction failed",
            format!(
                "worker {}, range {}, cursor {cursor}, cause: [{:?}] {}",
                WorkerType::Extractor { id: self.id },
                self.range,
                err.kind(),
                err.description()
            ),
            source: err
        )
    }
}

impl<S> Worker for ExtractWorker<S>
where
    S: Source + Send + Sync + 'static,
{
    fn worker_type(&self) -> WorkerType {
        WorkerType::Extractor { id: self.id }
    }

    async fn run(mut self) -> EtlResult<()> {
        let worker = self.worker_type();

        if self.range.is_empty() {
            info!(%worker, range = %self.range, "key range is empty, nothing to extract");
            return Ok(());
        }

        info!(%worker, range = %self.range, window = %self.window, "starting extraction");

        let mut cursor = self.range.initial_cursor();
        let mut page_number = 0u64;
        let mut extracted = 0u64;

        loop {
            if self.cancel_rx.is_cancelled() {
                info!(%worker, extracted, cursor, "extraction cancelled");
                bail!(ErrorKind::Cancelled, "Extraction cancelled");
            }

            etl_fail_point(EXTRACT_BEFORE_PAGE).map_err(|err| self.failure(cursor, err))?;

            let page = tokio::select! {
                biased;

                _ = self.cancel_rx.cancelled() => {
                    info!(%worker, extracted, cursor, "extraction cancelled during page query");
                    bail!(ErrorKind::Cancelled, "Extraction cancelled");
                }
                page = self.source.query_page(&self.range, &self.window, cursor, self.page_size) => {
                    page.map_err(|err| self.failure(cursor, err))?
                }
            };

            page_number += 1;
            self.stats.page_fetched();

            if page.is_empty() {
                info!(%worker, extracted, pages = page_number, "extraction completed");
                return Ok(());
            }

            let page_len = page.len();
            for record in page {
                if record.id <= cursor || record.id > self.range.end {
                    let err = etl_error!(
                        ErrorKind::InvalidData,
                        "Source returned a record outside the requested page",
                        format!("record id {} with cursor {cursor}", record.id)
                    );
                    return Err(self.failure(cursor, err));
                }

                cursor = record.id;
                self.queue.push(record).await?;
                self.stats.record_extracted();
                extracted += 1;
            }

            info!(
                %worker,
                page = page_number,
                rows = page_len,
                cursor,
                range_end = self.range.end,
                "fetched page"
            );
        }
    }
}

use std::collections::HashMap;

use tokio::task::{self, JoinSet};
use tracing::{debug, error};

use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::workers::base::{Worker, WorkerType};
use crate::workers::failures::{FailureOrigin, FailureTracker};

/// Reports a panicking worker while its task unwinds.
///
/// Reporting from `Drop` lets the run cancel immediately instead of when the pool is joined.
struct PanicReporter {
    worker_type: WorkerType,
    tracker: FailureTracker,
}

impl Drop for PanicReporter {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.tracker.report(
                FailureOrigin::Worker(self.worker_type),
                panic_error(self.worker_type),
            );
        }
    }
}

fn panic_error(worker_type: WorkerType) -> EtlError {
    etl_error!(ErrorKind::WorkerPanic, "Worker panicked", worker_type)
}

/// Runs the workers of one stage and acts as that stage's completion barrier.
///
/// A worker that fails is reported to the [`FailureTracker`] as soon as it returns, which
/// cancels the whole run.
#[derive(Debug)]
pub struct WorkerPool {
    join_set: JoinSet<(WorkerType, EtlResult<()>)>,
    workers: HashMap<task::Id, WorkerType>,
    tracker: FailureTracker,
}

impl WorkerPool {
    pub fn new(tracker: FailureTracker) -> Self {
        Self {
            join_set: JoinSet::new(),
            workers: HashMap::new(),
            tracker,
        }
    }

    pub fn spawn<W>(&mut self, worker: W)
    where
        W: Worker + Send + 'static,
    {
        let worker_type = worker.worker_type();
        let tracker = self.tracker.clone();

        let abort_handle = self.join_set.spawn(async move {
            let _panic_reporter = PanicReporter {
                worker_type,
                tracker: tracker.clone(),
            };

            let result = worker.run().await;
            match &result {
                Err(err) if !err.is_cancelled() => {
                    tracker.report(FailureOrigin::Worker(worker_type), err.clone());
                }
                _ => {}
            }

            (worker_type, result)
        });

        self.workers.insert(abort_handle.id(), worker_type);
        debug!(worker = %worker_type, "spawned worker");
    }

    pub fn len(&self) -> usize {
        self.join_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_set.is_empty()
    }

    /// Waits until every worker has exited.
    ///
    /// Returns the errors of the workers that failed, excluding workers that merely observed
    /// cancellation. Failures have already been reported to the tracker at this point.
    pub async fn wait_all(&mut self) -> EtlResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next_with_id().await {
            match result {
                Ok((id, (worker_type, worker_result))) => {
                    self.workers.remove(&id);

                    match worker_result {
                        Ok(()) => debug!(worker = %worker_type, "worker completed"),
                        Err(err) if err.is_cancelled() => {
                            debug!(worker = %worker_type, "worker stopped after cancellation")
                        }
                        Err(err) => {
                            error!(worker = %worker_type, error = %err, "worker completed with error");
                            errors.push(err);
                        }
                    }
                }
                Err(join_err) => {
                    let worker_type = self.workers.remove(&join_err.id());

                    if join_err.is_cancelled() {
                        debug!(worker = ?worker_type, "worker task was aborted");
                    } else if let Some(worker_type) = worker_type {
                        errors.push(panic_error(worker_type));
                    } else {
                        errors.push(etl_error!(ErrorKind::WorkerPanic, "Worker panicked"));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bail;
    use crate::concurrency::cancel::create_cancel_channel;

    struct FixedWorker {
        id: u16,
        outcome: fn() -> EtlResult<()>,
    }

    impl Worker for FixedWorker {
        fn worker_type(&self) -> WorkerType {
            WorkerType::Transformer { id: self.id }
        }

        async fn run(self) -> EtlResult<()> {
            (self.outcome)()
        }
    }

    fn fails() -> EtlResult<()> {
        bail!(ErrorKind::InvalidState, "Worker failed")
    }

    fn cancelled() -> EtlResult<()> {
        bail!(ErrorKind::Cancelled, "Run cancelled")
    }

    fn panics() -> EtlResult<()> {
        panic!("boom")
    }

    #[tokio::test]
    async fn successful_and_cancelled_workers_are_not_failures() {
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        let tracker = FailureTracker::new(cancel_tx);
        let mut pool = WorkerPool::new(tracker.clone());

        pool.spawn(FixedWorker { id: 1, outcome: || Ok(()) });
        pool.spawn(FixedWorker { id: 2, outcome: cancelled });

        assert!(pool.wait_all().await.is_ok());
        assert!(tracker.failures().is_empty());
        assert!(!cancel_rx.is_cancelled());
    }

    #[tokio::test]
    async fn failing_worker_is_reported_and_cancels() {
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        let tracker = FailureTracker::new(cancel_tx);
        let mut pool = WorkerPool::new(tracker.clone());

        pool.spawn(FixedWorker { id: 3, outcome: fails });

        let err = pool.wait_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(cancel_rx.is_cancelled());
        assert_eq!(
            tracker.failures()[0].origin,
            FailureOrigin::Worker(WorkerType::Transformer { id: 3 })
        );
    }

    #[tokio::test]
    async fn panicking_worker_is_reported_as_worker_panic() {
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        let tracker = FailureTracker::new(cancel_tx);
        let mut pool = WorkerPool::new(tracker.clone());

        pool.spawn(FixedWorker { id: 4, outcome: panics });

        let err = pool.wait_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WorkerPanic);
        assert!(cancel_rx.is_cancelled());
        assert_eq!(tracker.failures()[0].error.kind(), ErrorKind::WorkerPanic);
    }
}

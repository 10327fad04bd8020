use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use crate::concurrency::cancel::CancelTx;
use crate::error::EtlError;
use crate::workers::base::WorkerType;

/// Component that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    RangeResolver,
    Worker(WorkerType),
    /// The run exceeded its configured deadline.
    Deadline,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureOrigin::RangeResolver => f.write_str("range-resolver"),
            FailureOrigin::Worker(worker_type) => write!(f, "{worker_type}"),
            FailureOrigin::Deadline => f.write_str("deadline"),
        }
    }
}

/// A failure recorded during a run.
#[derive(Debug, Clone)]
pub struct WorkerFailure {
    pub origin: FailureOrigin,
    pub error: EtlError,
    /// Whether this failure raised the cancellation signal.
    pub root_cause: bool,
}

/// Collects failures from every stage and cancels the run on the first one.
///
/// Failures are kept in report order. Recording and cancelling happen under one lock, so the
/// failure that raised the signal is always the first one recorded.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    failures: Arc<Mutex<Vec<WorkerFailure>>>,
    cancel_tx: CancelTx,
}

impl FailureTracker {
    pub fn new(cancel_tx: CancelTx) -> Self {
        Self {
            failures: Arc::new(Mutex::new(Vec::new())),
            cancel_tx,
        }
    }

    /// Records `error` and raises cancellation.
    pub fn report(&self, origin: FailureOrigin, error: EtlError) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let root_cause = self.cancel_tx.cancel();

        error!(
            %origin,
            root_cause,
            kind = ?error.kind(),
            detail = error.detail().unwrap_or_default(),
            "stage failed, cancelling run"
        );

        failures.push(WorkerFailure {
            origin,
            error,
            root_cause,
        });
    }

    /// Returns the failures recorded so far, in report order.
    pub fn failures(&self) -> Vec<WorkerFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify, watch};

use crate::destination::Destination;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::test_utils::notify::TimedNotify;
use crate::types::Record;

type FlushCondition = Box<dyn Fn(&FlushLog) -> bool + Send + Sync>;

/// What a [`TestDestinationWrapper`] has observed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushLog {
    /// Number of `bulk_upsert` calls, counted when the call starts.
    pub calls: u64,
    /// Sizes of the batches that were written, in completion order.
    pub committed: Vec<usize>,
    /// Sizes of the batches that failed, in completion order.
    pub failed: Vec<usize>,
}

impl FlushLog {
    pub fn committed_records(&self) -> usize {
        self.committed.iter().sum()
    }
}

struct Inner {
    log: FlushLog,
    failing_calls: HashSet<u64>,
    conditions: Vec<(FlushCondition, Arc<Notify>)>,
}

impl Inner {
    fn check_conditions(&mut self) {
        let log = &self.log;
        self.conditions.retain(|(condition, notify)| {
            let should_retain = !condition(log);
            if !should_retain {
                notify.notify_one();
            }
            should_retain
        });
    }
}

/// Wraps a [`Destination`] to observe, fail, or hold its flushes.
#[derive(Clone)]
pub struct TestDestinationWrapper<D> {
    wrapped: D,
    inner: Arc<Mutex<Inner>>,
    gate: Arc<watch::Sender<bool>>,
}

impl<D: fmt::Debug> fmt::Debug for TestDestinationWrapper<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDestinationWrapper")
            .field("wrapped", &self.wrapped)
            .field("gate_open", &*self.gate.borrow())
            .finish()
    }
}

impl<D> TestDestinationWrapper<D> {
    pub fn wrap(destination: D) -> Self {
        let (gate, _) = watch::channel(true);

        Self {
            wrapped: destination,
            inner: Arc::new(Mutex::new(Inner {
                log: FlushLog::default(),
                failing_calls: HashSet::new(),
                conditions: Vec::new(),
            })),
            gate: Arc::new(gate),
        }
    }

    pub fn wrapped(&self) -> &D {
        &self.wrapped
    }

    /// Makes the `call`-th `bulk_upsert` (1-based) fail without touching the wrapped destination.
    pub async fn fail_on_call(&self, call: u64) {
        self.inner.lock().await.failing_calls.insert(call);
    }

    /// Blocks every flush that starts from now on until [`Self::release_flushes`] is called.
    pub fn hold_flushes(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_flushes(&self) {
        self.gate.send_replace(true);
    }

    pub async fn flush_log(&self) -> FlushLog {
        self.inner.lock().await.log.clone()
    }

    /// Sizes of the committed batches, sorted so the result does not depend on loader timing.
    pub async fn committed_batch_sizes(&self) -> Vec<usize> {
        let mut sizes = self.inner.lock().await.log.committed.clone();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    /// Fires once `condition` holds for the flush log.
    pub async fn notify_on<F>(&self, condition: F) -> TimedNotify
    where
        F: Fn(&FlushLog) -> bool + Send + Sync + 'static,
    {
        let notify = Arc::new(Notify::new());
        let mut inner = self.inner.lock().await;
        inner.conditions.push((Box::new(condition), notify.clone()));
        inner.check_conditions();

        TimedNotify::new(notify)
    }

    /// Fires once at least `calls` flushes have started.
    pub async fn wait_for_flush_calls(&self, calls: u64) -> TimedNotify {
        self.notify_on(move |log| log.calls >= calls).await
    }
}

impl<D> Destination for TestDestinationWrapper<D>
where
    D: Destination + Send + Sync,
{
    fn name() -> &'static str {
        D::name()
    }

    async fn bulk_upsert(&self, records: Vec<Record>) -> EtlResult<()> {
        let call = {
            let mut inner = self.inner.lock().await;
            inner.log.calls += 1;
            inner.check_conditions();
            inner.log.calls
        };

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let batch_size = records.len();
        let fail = self.inner.lock().await.failing_calls.contains(&call);
        let result = if fail {
            Err(etl_error!(
                ErrorKind::DestinationQueryFailed,
                "Injected bulk upsert failure",
                format!("call {call}, batch size {batch_size}")
            ))
        } else {
            self.wrapped.bulk_upsert(records).await
        };

        let mut inner = self.inner.lock().await;
        match &result {
            Ok(()) => inner.log.committed.push(batch_size),
            Err(_) => inner.log.failed.push(batch_size),
        }
        inner.check_conditions();

        result
    }
}

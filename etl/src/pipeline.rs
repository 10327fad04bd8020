use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use etl_config::shared::PipelineConfig;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::concurrency::cancel::{CancelTx, create_cancel_channel};
use crate::concurrency::queue::bounded_queue;
use crate::destination::Destination;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::partition::{partition_key_space, resolve_id_bounds};
use crate::source::Source;
use crate::transform::{Transform, UppercaseMessage};
use crate::types::{IdBounds, Record, TimeWindow};
use crate::workers::extract::ExtractWorker;
use crate::workers::failures::{FailureOrigin, FailureTracker, WorkerFailure};
use crate::workers::load::LoadWorker;
use crate::workers::pool::WorkerPool;
use crate::workers::stats::{RunCounts, RunStats};
use crate::workers::transform::TransformWorker;

/// Identifier of one pipeline run.
pub type RunId = Uuid;

/// Phase of a run.
///
/// Phases only move forward. Cancellation is tracked separately and can happen in any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelinePhase {
    /// Resolving the key interval of the time window.
    Resolving,
    /// All three pools are running.
    Running,
    /// Every extractor has exited and the queues are being drained.
    Draining,
    /// Every worker has exited.
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelinePhase::Resolving => f.write_str("resolving"),
            PipelinePhase::Running => f.write_str("running"),
            PipelinePhase::Draining => f.write_str("draining"),
            PipelinePhase::Done => f.write_str("done"),
        }
    }
}

/// One batch run moving the records of a time window from a [`Source`] to a [`Destination`].
///
/// Records flow through two bounded queues: extractors fill the first, transformers move records
/// from the first to the second, and loaders drain the second into the destination in batches.
/// A failure anywhere raises the shared cancellation signal; the coordinator still closes the
/// queues in order and waits for every pool, so [`Pipeline::run`] never leaves a worker behind.
#[derive(Debug)]
pub struct Pipeline<S, D, T = UppercaseMessage> {
    run_id: RunId,
    config: Arc<PipelineConfig>,
    window: TimeWindow,
    source: S,
    destination: D,
    transform: T,
    cancel_tx: CancelTx,
    stats: RunStats,
    phase_tx: watch::Sender<PipelinePhase>,
}

impl<S, D> Pipeline<S, D> {
    /// Creates a run with the default transformation.
    ///
    /// Fails with [`ErrorKind::ConfigError`] if `config` is invalid.
    pub fn new(
        config: PipelineConfig,
        window: TimeWindow,
        source: S,
        destination: D,
    ) -> EtlResult<Self> {
        if let Err(err) = config.validate() {
            return Err(etl_error!(
                ErrorKind::ConfigError,
                "Invalid pipeline configuration",
                err
            ));
        }

        let (cancel_tx, _) = create_cancel_channel();
        let (phase_tx, _) = watch::channel(PipelinePhase::Resolving);

        Ok(Self {
            run_id: Uuid::new_v4(),
            config: Arc::new(config),
            window,
            source,
            destination,
            transform: UppercaseMessage,
            cancel_tx,
            stats: RunStats::new(),
            phase_tx,
        })
    }
}

impl<S, D, T> Pipeline<S, D, T> {
    /// Replaces the per-record transformation.
    pub fn with_transform<U>(self, transform: U) -> Pipeline<S, D, U> {
        Pipeline {
            run_id: self.run_id,
            config: self.config,
            window: self.window,
            source: self.source,
            destination: self.destination,
            transform,
            cancel_tx: self.cancel_tx,
            stats: self.stats,
            phase_tx: self.phase_tx,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Returns a handle that cancels the run from outside, for example on a shutdown signal.
    pub fn cancel_tx(&self) -> CancelTx {
        self.cancel_tx.clone()
    }

    /// Returns the live counters of the run.
    pub fn stats(&self) -> RunStats {
        self.stats.clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<PipelinePhase> {
        self.phase_tx.subscribe()
    }

    fn set_phase(&self, phase: PipelinePhase) {
        self.phase_tx.send_replace(phase);
        info!(run_id = %self.run_id, %phase, "pipeline phase changed");
    }
}

impl<S, D, T> Pipeline<S, D, T>
where
    S: Source + Clone + Send + Sync + 'static,
    D: Destination + Clone + Send + Sync + 'static,
    T: Transform + Clone + Send + Sync + 'static,
{
    /// Runs the pipeline to completion and returns its summary.
    ///
    /// The run itself never returns an error: failures are recorded in the summary, and
    /// [`RunSummary::into_result`] turns an unsuccessful summary into one.
    pub async fn run(self) -> RunSummary {
        let started = Instant::now();
        let tracker = FailureTracker::new(self.cancel_tx.clone());
        let deadline = self
            .config
            .timeout_ms
            .map(|timeout_ms| started + Duration::from_millis(timeout_ms));

        info!(
            run_id = %self.run_id,
            window = %self.window,
            source = S::name(),
            destination = D::name(),
            transform = self.transform.name(),
            extractors = self.config.extractor_workers,
            transformers = self.config.transformer_workers,
            loaders = self.config.loader_workers,
            "starting pipeline run"
        );

        if let Some(bounds) = self.resolve(&tracker, deadline).await {
            if bounds.is_empty() {
                info!(run_id = %self.run_id, window = %self.window, "no records in time window, nothing to do");
            } else {
                self.run_pools(bounds, &tracker, deadline).await;
            }
        }

        self.set_phase(PipelinePhase::Done);

        let summary = RunSummary {
            run_id: self.run_id,
            window: self.window,
            counts: self.stats.snapshot(),
            elapsed: started.elapsed(),
            failures: tracker.failures(),
            cancelled: self.cancel_tx.is_cancelled(),
        };

        if summary.is_success() {
            info!(run_id = %self.run_id, %summary, "pipeline run completed");
        } else {
            error!(run_id = %self.run_id, %summary, "pipeline run failed");
        }

        summary
    }

    /// Resolves the key interval, racing it against cancellation and the deadline.
    ///
    /// Returns `None` when the run must stop before any worker starts.
    async fn resolve(
        &self,
        tracker: &FailureTracker,
        deadline: Option<Instant>,
    ) -> Option<IdBounds> {
        let mut cancel_rx = self.cancel_tx.subscribe();

        tokio::select! {
            biased;

            _ = cancel_rx.cancelled() => {
                warn!(run_id = %self.run_id, "pipeline cancelled while resolving the key range");
                None
            }
            _ = sleep_until(deadline) => {
                tracker.report(FailureOrigin::Deadline, timeout_error(&self.config, PipelinePhase::Resolving));
                None
            }
            result = resolve_id_bounds(&self.source, &self.window) => match result {
                Ok(bounds) => Some(bounds),
                Err(err) => {
                    tracker.report(FailureOrigin::RangeResolver, err);
                    None
                }
            },
        }
    }

    async fn run_pools(&self, bounds: IdBounds, tracker: &FailureTracker, deadline: Option<Instant>) {
        let ranges = partition_key_space(bounds, self.config.extractor_workers as usize);

        let (extract_tx, extract_rx) = bounded_queue::<Record>(
            self.config.extract_queue_capacity,
            self.cancel_tx.subscribe(),
        );
        let (load_tx, load_rx) = bounded_queue::<Record>(
            self.config.transform_queue_capacity,
            self.cancel_tx.subscribe(),
        );

        self.set_phase(PipelinePhase::Running);

        // Consumers are started first so that producers never wait on a pool that does not
        // exist yet.
        let mut loaders = WorkerPool::new(tracker.clone());
        for id in 1..=self.config.loader_workers {
            loaders.spawn(LoadWorker::new(
                id,
                self.destination.clone(),
                load_rx.clone(),
                self.config.batch.max_size,
                self.stats.clone(),
                tracker.clone(),
                self.cancel_tx.subscribe(),
            ));
        }
        drop(load_rx);

        let mut transformers = WorkerPool::new(tracker.clone());
        for id in 1..=self.config.transformer_workers {
            transformers.spawn(TransformWorker::new(
                id,
                self.transform.clone(),
                extract_rx.clone(),
                load_tx.clone(),
                self.stats.clone(),
            ));
        }
        drop(extract_rx);

        let mut extractors = WorkerPool::new(tracker.clone());
        for (index, range) in ranges.into_iter().enumerate() {
            info!(run_id = %self.run_id, extractor = index + 1, %range, "assigned key range");
            extractors.spawn(ExtractWorker::new(
                (index + 1) as u16,
                self.source.clone(),
                range,
                self.window,
                self.config.page_size,
                extract_tx.clone(),
                self.stats.clone(),
                self.cancel_tx.subscribe(),
            ));
        }

        let watchdog = deadline.map(|deadline| {
            let tracker = tracker.clone();
            let config = self.config.clone();
            let mut cancel_rx = self.cancel_tx.subscribe();

            tokio::spawn(async move {
                tokio::select! {
                    biased;

                    _ = cancel_rx.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        tracker.report(FailureOrigin::Deadline, timeout_error(&config, PipelinePhase::Running));
                    }
                }
            })
        });

        log_pool_result("extract", extractors.wait_all().await);
        info!(run_id = %self.run_id, pending = extract_tx.pending(), "extractors finished, closing extract queue");
        extract_tx.close();
        self.set_phase(PipelinePhase::Draining);

        log_pool_result("transform", transformers.wait_all().await);
        info!(run_id = %self.run_id, pending = load_tx.pending(), "transformers finished, closing load queue");
        load_tx.close();

        log_pool_result("load", loaders.wait_all().await);

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
    }
}

/// Waits until `deadline`, or forever when there is none.
fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

fn timeout_error(config: &PipelineConfig, phase: PipelinePhase) -> EtlError {
    etl_error!(
        ErrorKind::PipelineTimedOut,
        "Pipeline run exceeded its deadline",
        format!(
            "timeout of {} ms reached while {phase}",
            config.timeout_ms.unwrap_or_default()
        )
    )
}

fn log_pool_result(stage: &str, result: EtlResult<()>) {
    match result {
        Ok(()) => info!(stage, "all workers of the stage exited"),
        Err(err) => warn!(stage, failed = err.kinds().len(), "workers of the stage exited with errors"),
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub window: TimeWindow,
    pub counts: RunCounts,
    pub elapsed: Duration,
    /// Failures in report order. The first one is the root cause of the cancellation.
    pub failures: Vec<WorkerFailure>,
    /// Whether the cancellation signal was raised, by a failure or from outside.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Returns the failure that caused the run to stop, if any.
    pub fn first_failure(&self) -> Option<&WorkerFailure> {
        self.failures
            .iter()
            .find(|failure| failure.root_cause)
            .or_else(|| self.failures.first())
    }

    /// Returns the summary if the run succeeded, otherwise the root cause error.
    ///
    /// A run cancelled from outside without any failure yields [`ErrorKind::Cancelled`].
    pub fn into_result(self) -> EtlResult<RunSummary> {
        if self.is_success() {
            return Ok(self);
        }

        match self.first_failure() {
            Some(failure) => Err(failure.error.clone()),
            None => Err(etl_error!(
                ErrorKind::Cancelled,
                "Pipeline run was cancelled",
                format!("run {}", self.run_id)
            )),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = &self.counts;
        let status = if self.is_success() {
            "succeeded"
        } else if self.failures.is_empty() {
            "cancelled"
        } else {
            "failed"
        };

        write!(
            f,
            "run {} over {} {status} in {:.3}s: {} extracted, {} transformed, {} loaded in {} batches \
             ({} batches failed, {} records dropped, {} pages fetched)",
            self.run_id,
            self.window,
            self.elapsed.as_secs_f64(),
            counts.records_extracted,
            counts.records_transformed,
            counts.records_loaded,
            counts.batches_flushed,
            counts.batches_failed,
            counts.records_dropped(),
            counts.pages_fetched,
        )?;

        if let Some(failure) = self.first_failure() {
            write!(
                f,
                "; first failure in {}: [{:?}] {}",
                failure.origin,
                failure.error.kind(),
                failure.error.description()
            )?;
            if let Some(detail) = failure.error.detail() {
                write!(f, " ({detail})")?;
            }
            if self.failures.len() > 1 {
                write!(f, "; {} more failures recorded", self.failures.len() - 1)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::base::WorkerType;

    fn window() -> TimeWindow {
        TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap()
    }

    fn summary(failures: Vec<WorkerFailure>, cancelled: bool) -> RunSummary {
        RunSummary {
            run_id: Uuid::nil(),
            window: window(),
            counts: RunCounts {
                records_extracted: 10,
                records_loaded: 4,
                ..RunCounts::default()
            },
            elapsed: Duration::from_millis(1500),
            failures,
            cancelled,
        }
    }

    #[test]
    fn summary_without_failures_is_success() {
        let summary = summary(vec![], false);

        assert!(summary.is_success());
        assert!(summary.first_failure().is_none());
        assert!(summary.clone().into_result().is_ok());
        assert!(summary.to_string().contains("succeeded"));
    }

    #[test]
    fn external_cancellation_is_not_success() {
        let err = summary(vec![], true).into_result().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn root_cause_is_surfaced_first() {
        let failures = vec![
            WorkerFailure {
                origin: FailureOrigin::Deadline,
                error: etl_error!(ErrorKind::PipelineTimedOut, "Pipeline run exceeded its deadline"),
                root_cause: false,
            },
            WorkerFailure {
                origin: FailureOrigin::Worker(WorkerType::Extractor { id: 2 }),
                error: etl_error!(ErrorKind::ExtractFailure, "Extraction failed", "range [7, 12]"),
                root_cause: true,
            },
        ];
        let summary = summary(failures, true);

        let rendered = summary.to_string();
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("extractor-2"));
        assert!(rendered.contains("6 records dropped"));
        assert!(rendered.contains("1 more failures recorded"));
        assert_eq!(
            summary.into_result().unwrap_err().kind(),
            ErrorKind::ExtractFailure
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            loader_workers: 0,
            ..PipelineConfig::default()
        };

        let err = Pipeline::new(config, window(), (), ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn phases_are_ordered() {
        assert!(PipelinePhase::Resolving < PipelinePhase::Running);
        assert!(PipelinePhase::Draining < PipelinePhase::Done);
        assert_eq!(PipelinePhase::Draining.to_string(), "draining");
    }
}

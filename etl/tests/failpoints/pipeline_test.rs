use std::time::Duration;

use etl::destination::memory::MemoryDestination;
use etl::error::ErrorKind;
use etl::failpoints::{EXTRACT_BEFORE_PAGE, LOAD_BEFORE_FLUSH, TRANSFORM_BEFORE_PUSH};
use etl::pipeline::{Pipeline, RunSummary};
use etl::source::memory::MemorySource;
use etl::test_utils::failpoints::CustomFailScenario;
use etl::test_utils::records::generate_records;
use etl::test_utils::test_destination_wrapper::TestDestinationWrapper;
use etl::types::TimeWindow;
use etl::workers::base::{Stage, WorkerType};
use etl::workers::failures::FailureOrigin;
use etl_config::shared::{BatchConfig, PipelineConfig};
use etl_telemetry::tracing::init_test_tracing;

fn window() -> TimeWindow {
    TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap()
}

fn config(extractors: u16) -> PipelineConfig {
    PipelineConfig {
        extractor_workers: extractors,
        transformer_workers: 2,
        loader_workers: 1,
        page_size: 10,
        extract_queue_capacity: 50,
        transform_queue_capacity: 50,
        batch: BatchConfig { max_size: 10 },
        timeout_ms: None,
    }
}

async fn run(
    extractors: u16,
    destination: TestDestinationWrapper<MemoryDestination>,
) -> RunSummary {
    let source = MemorySource::new(generate_records(1, 200, &window(), 11));
    let pipeline = Pipeline::new(config(extractors), window(), source, destination).unwrap();

    tokio::time::timeout(Duration::from_secs(30), pipeline.run())
        .await
        .expect("pipeline run did not terminate in time")
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_page_query_reports_extract_failure() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(EXTRACT_BEFORE_PAGE, "2*off->return(page)")]);

    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    let summary = run(1, destination.clone()).await;

    let failure = summary.first_failure().unwrap();
    assert_eq!(failure.error.kind(), ErrorKind::ExtractFailure);
    assert_eq!(
        failure.origin,
        FailureOrigin::Worker(WorkerType::Extractor { id: 1 })
    );
    assert!(failure.error.detail().unwrap().contains("FailpointTriggered"));

    // Two pages made it through before the failure.
    assert_eq!(summary.counts.pages_fetched, 2);
    assert_eq!(summary.counts.records_extracted, 20);
    assert!(summary.counts.records_loaded <= 20);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_flush_reports_load_failure() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(LOAD_BEFORE_FLUSH, "1*off->return(flush)")]);

    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    let summary = run(1, destination.clone()).await;

    let failure = summary.first_failure().unwrap();
    assert_eq!(failure.error.kind(), ErrorKind::LoadFailure);
    assert_eq!(failure.origin.to_string(), "loader-1");
    assert_eq!(summary.counts.batches_flushed, 1);
    assert_eq!(summary.counts.batches_failed, 1);
    assert_eq!(destination.flush_log().await.committed, vec![10]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_transformer_cancels_the_run() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(TRANSFORM_BEFORE_PUSH, "5*off->return")]);

    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    let summary = run(2, destination).await;

    assert!(summary.cancelled);
    let failure = summary.first_failure().unwrap();
    assert_eq!(failure.error.kind(), ErrorKind::FailpointTriggered);
    match failure.origin {
        FailureOrigin::Worker(worker) => assert_eq!(worker.stage(), Stage::Transform),
        origin => panic!("unexpected failure origin {origin}"),
    }
    assert!(summary.counts.records_transformed < 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_extractor_is_reported_as_worker_panic() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(EXTRACT_BEFORE_PAGE, "1*off->panic")]);

    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    let summary = run(1, destination).await;

    let failure = summary.first_failure().unwrap();
    assert_eq!(failure.error.kind(), ErrorKind::WorkerPanic);
    assert_eq!(
        failure.origin,
        FailureOrigin::Worker(WorkerType::Extractor { id: 1 })
    );
    assert!(!summary.is_success());
}

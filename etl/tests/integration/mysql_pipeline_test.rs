use etl::destination::mysql::MySqlDestination;
use etl::pipeline::Pipeline;
use etl::source::mysql::MySqlSource;
use etl::test_utils::database::{
    TEST_SOURCE_TABLE, TEST_TARGET_TABLE, TestDatabases, insert_source_records, spawn_databases,
    target_records,
};
use etl::test_utils::records::{generate_records, generate_records_before};
use etl::types::{Record, TimeWindow};
use etl_config::shared::{BatchConfig, PipelineConfig};
use etl_telemetry::tracing::init_test_tracing;

fn window() -> TimeWindow {
    TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        extractor_workers: 3,
        transformer_workers: 2,
        loader_workers: 2,
        page_size: 100,
        extract_queue_capacity: 500,
        transform_queue_capacity: 500,
        batch: BatchConfig { max_size: 250 },
        timeout_ms: Some(60_000),
    }
}

async fn run_once(databases: &TestDatabases) {
    let source = MySqlSource::new(databases.source_pool.clone(), TEST_SOURCE_TABLE);
    let destination = MySqlDestination::new(databases.target_pool.clone(), TEST_TARGET_TABLE);

    let summary = Pipeline::new(config(), window(), source, destination)
        .unwrap()
        .run()
        .await;

    assert!(summary.is_success(), "{summary}");
}

fn business_view(records: &[Record]) -> Vec<(String, String, String, String)> {
    records
        .iter()
        .map(|record| {
            (
                record.timestamp.to_string(),
                record.device_type.clone(),
                record.event_type.clone(),
                record.message.clone(),
            )
        })
        .collect()
}

#[ignore = "needs a MySQL server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn window_is_copied_uppercased_and_reruns_are_idempotent() {
    init_test_tracing();
    let databases = spawn_databases().await;

    let inside = generate_records(1, 1_200, &window(), 21);
    let outside = generate_records_before(10_001, 50, &window());
    insert_source_records(&databases.source_pool, TEST_SOURCE_TABLE, &inside).await;
    insert_source_records(&databases.source_pool, TEST_SOURCE_TABLE, &outside).await;

    run_once(&databases).await;

    let loaded = target_records(&databases.target_pool, TEST_TARGET_TABLE).await;
    assert_eq!(loaded.len(), 1_200);
    assert!(loaded.iter().all(|record| window().contains(record.timestamp)));
    assert!(
        loaded
            .iter()
            .all(|record| record.message == record.message.to_uppercase())
    );

    // A second run hits every business key again and leaves the target unchanged.
    run_once(&databases).await;
    let reloaded = target_records(&databases.target_pool, TEST_TARGET_TABLE).await;
    assert_eq!(business_view(&reloaded), business_view(&loaded));

    databases.drop_all().await;
}

#[ignore = "needs a MySQL server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn changed_source_messages_overwrite_target_messages() {
    init_test_tracing();
    let databases = spawn_databases().await;

    let records = generate_records(1, 100, &window(), 22);
    insert_source_records(&databases.source_pool, TEST_SOURCE_TABLE, &records).await;
    run_once(&databases).await;

    sqlx::query("update `raw_records` set message = concat('changed ', message) where id <= 10")
        .execute(&databases.source_pool)
        .await
        .unwrap();
    run_once(&databases).await;

    let loaded = target_records(&databases.target_pool, TEST_TARGET_TABLE).await;
    assert_eq!(loaded.len(), 100);
    assert_eq!(
        loaded
            .iter()
            .filter(|record| record.message.starts_with("CHANGED "))
            .count(),
        10
    );

    databases.drop_all().await;
}

use etl_config::shared::MySqlConnectionConfig;
use etl_mysql::db::quote_identifier;
use etl_mysql::schema::create_tables;
use etl_mysql::test_utils::{create_mysql_database, drop_mysql_database, local_mysql_connection_config};
use sqlx::{MySqlPool, QueryBuilder, Row};

use crate::types::Record;

pub const TEST_SOURCE_TABLE: &str = "raw_records";
pub const TEST_TARGET_TABLE: &str = "records";

/// A pair of throwaway databases holding the source and target tables.
///
/// Call [`TestDatabases::drop_all`] at the end of the test to remove them.
#[derive(Debug)]
pub struct TestDatabases {
    pub source_config: MySqlConnectionConfig,
    pub source_pool: MySqlPool,
    pub target_config: MySqlConnectionConfig,
    pub target_pool: MySqlPool,
}

impl TestDatabases {
    pub async fn drop_all(self) {
        self.source_pool.close().await;
        self.target_pool.close().await;

        drop_mysql_database(&self.source_config).await;
        drop_mysql_database(&self.target_config).await;
    }
}

/// Creates two uniquely named databases and the test tables inside them.
///
/// # Panics
///
/// Panics if the server is unreachable or the tables cannot be created.
pub async fn spawn_databases() -> TestDatabases {
    let source_config = local_mysql_connection_config();
    let target_config = local_mysql_connection_config();

    let source_pool = create_mysql_database(&source_config).await;
    let target_pool = create_mysql_database(&target_config).await;

    create_tables(&source_pool, TEST_SOURCE_TABLE, &target_pool, TEST_TARGET_TABLE)
        .await
        .expect("Failed to create test tables");

    TestDatabases {
        source_config,
        source_pool,
        target_config,
        target_pool,
    }
}

/// Inserts `records` into the source table, ids included.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn insert_source_records(pool: &MySqlPool, table: &str, records: &[Record]) {
    for chunk in records.chunks(1_000) {
        let mut builder = QueryBuilder::new(format!(
            "insert into {} (id, date, timestamp, device_type, event_type, message) ",
            quote_identifier(table)
        ));
        builder.push_values(chunk, |mut row, record| {
            row.push_bind(record.id)
                .push_bind(record.date)
                .push_bind(record.timestamp)
                .push_bind(record.device_type.as_str())
                .push_bind(record.event_type.as_str())
                .push_bind(record.message.as_str());
        });

        builder
            .build()
            .execute(pool)
            .await
            .expect("Failed to insert source records");
    }
}

/// Reads every target row ordered by business key.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn target_records(pool: &MySqlPool, table: &str) -> Vec<Record> {
    let query = format!(
        "select id, date, timestamp, device_type, event_type, message from {} \
         order by date, timestamp, device_type, event_type",
        quote_identifier(table)
    );

    sqlx::query(&query)
        .fetch_all(pool)
        .await
        .expect("Failed to read target records")
        .into_iter()
        .map(|row| Record {
            id: row.get("id"),
            date: row.get("date"),
            timestamp: row.get("timestamp"),
            device_type: row.get("device_type"),
            event_type: row.get("event_type"),
            message: row.get("message"),
        })
        .collect()
}

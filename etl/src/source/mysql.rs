use etl_mysql::db::quote_identifier;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use crate::error::EtlResult;
use crate::source::Source;
use crate::types::{IdBounds, KeyRange, Record, TimeWindow};

/// Reads raw events from a MySQL table.
///
/// Both queries rely on the table's primary key on `id` and an index on `timestamp`.
#[derive(Debug, Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
    range_query: String,
    page_query: String,
}

impl MySqlSource {
    pub fn new(pool: MySqlPool, table: &str) -> Self {
        Self {
            pool,
            range_query: range_query(table),
            page_query: page_query(table),
        }
    }
}

impl Source for MySqlSource {
    fn name() -> &'static str {
        "mysql"
    }

    async fn query_range(&self, window: &TimeWindow) -> EtlResult<IdBounds> {
        let (min_id, max_id): (Option<i64>, Option<i64>) = sqlx::query_as(&self.range_query)
            .bind(window.start())
            .bind(window.end())
            .fetch_one(&self.pool)
            .await?;

        match (min_id, max_id) {
            (Some(min_id), Some(max_id)) => Ok(IdBounds::new(min_id, max_id)),
            _ => Ok(IdBounds::empty()),
        }
    }

    async fn query_page(
        &self,
        range: &KeyRange,
        window: &TimeWindow,
        cursor: i64,
        page_size: u32,
    ) -> EtlResult<Vec<Record>> {
        let rows = sqlx::query(&self.page_query)
            .bind(cursor)
            .bind(range.end)
            .bind(window.start())
            .bind(window.end())
            .bind(page_size)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(decode_record(row)?);
        }

        Ok(records)
    }
}

fn decode_record(row: &MySqlRow) -> Result<Record, sqlx::Error> {
    Ok(Record {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        timestamp: row.try_get("timestamp")?,
        device_type: row.try_get("device_type")?,
        event_type: row.try_get("event_type")?,
        message: row.try_get("message")?,
    })
}

fn range_query(table: &str) -> String {
    format!(
        "select min(`id`), max(`id`) from {} where `timestamp` >= ? and `timestamp` < ?",
        quote_identifier(table)
    )
}

fn page_query(table: &str) -> String {
    format!(
        "select `id`, `date`, `timestamp`, `device_type`, `event_type`, `message` \
         from {} \
         where `id` > ? and `id` <= ? and `timestamp` >= ? and `timestamp` < ? \
         order by `id` \
         limit ?",
        quote_identifier(table)
    )
}

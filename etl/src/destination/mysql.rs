use etl_mysql::db::quote_identifier;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::warn;

use crate::destination::Destination;
use crate::error::{EtlResult, destination_error};
use crate::types::{OVERWRITE_COLUMN, Record, TARGET_COLUMNS};

/// Writes records to a MySQL table through multi-row `insert ... on duplicate key update`.
///
/// The table must carry a unique key over the business columns.
#[derive(Debug, Clone)]
pub struct MySqlDestination {
    pool: MySqlPool,
    table: String,
}

impl MySqlDestination {
    pub fn new(pool: MySqlPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

impl Destination for MySqlDestination {
    fn name() -> &'static str {
        "mysql"
    }

    async fn bulk_upsert(&self, records: Vec<Record>) -> EtlResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut transaction = self.pool.begin().await.map_err(destination_error)?;

        let mut query = build_upsert_query(&self.table, &records);
        if let Err(err) = query.build().execute(&mut *transaction).await {
            if let Err(rollback_err) = transaction.rollback().await {
                warn!(
                    table = %self.table,
                    error = %rollback_err,
                    "failed to roll back bulk upsert"
                );
            }

            return Err(destination_error(err));
        }

        transaction.commit().await.map_err(destination_error)?;

        Ok(())
    }
}

/// Builds a single statement upserting every record.
///
/// `values()` refers to the row being inserted, so a key repeated in the batch resolves to the
/// last occurrence.
pub fn build_upsert_query<'a>(table: &str, records: &'a [Record]) -> QueryBuilder<'a, MySql> {
    let columns = TARGET_COLUMNS
        .iter()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ");

    let mut builder =
        QueryBuilder::new(format!("insert into {} ({columns}) ", quote_identifier(table)));

    builder.push_values(records, |mut row, record| {
        row.push_bind(record.date)
            .push_bind(record.timestamp)
            .push_bind(record.device_type.as_str())
            .push_bind(record.event_type.as_str())
            .push_bind(record.message.as_str());
    });

    let overwrite = quote_identifier(OVERWRITE_COLUMN);
    builder.push(format!(
        " on duplicate key update {overwrite} = values({overwrite})"
    ));

    builder
}

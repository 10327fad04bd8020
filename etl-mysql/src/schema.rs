use sqlx::{Executor, MySqlPool};

use crate::db::quote_identifier;

/// Returns the DDL of the source table holding raw events.
///
/// `id` is the monotonically increasing key the extractors paginate on; `timestamp` is indexed
/// because every extraction query filters on it.
pub fn source_table_ddl(table: &str) -> String {
    format!(
        "create table if not exists {} (
            id bigint not null auto_increment primary key,
            date date not null,
            timestamp datetime not null,
            device_type varchar(64) not null,
            event_type varchar(64) not null,
            message text not null,
            index idx_timestamp (timestamp)
        )",
        quote_identifier(table)
    )
}

/// Returns the DDL of the target table.
///
/// The unique key over the business columns is what turns the loaders' inserts into upserts.
pub fn target_table_ddl(table: &str) -> String {
    format!(
        "create table if not exists {} (
            id bigint not null auto_increment primary key,
            date date not null,
            timestamp datetime not null,
            device_type varchar(64) not null,
            event_type varchar(64) not null,
            message text not null,
            unique key uk_business_key (date, timestamp, device_type, event_type)
        )",
        quote_identifier(table)
    )
}

/// Creates both tables if they are missing.
pub async fn create_tables(
    source: &MySqlPool,
    source_table: &str,
    target: &MySqlPool,
    target_table: &str,
) -> Result<(), sqlx::Error> {
    source.execute(source_table_ddl(source_table).as_str()).await?;
    target.execute(target_table_ddl(target_table).as_str()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_table_has_business_unique_key() {
        let ddl = target_table_ddl("records");

        assert!(ddl.contains("`records`"));
        assert!(ddl.contains("unique key uk_business_key (date, timestamp, device_type, event_type)"));
    }

    #[test]
    fn source_table_indexes_timestamp() {
        assert!(source_table_ddl("raw_records").contains("index idx_timestamp (timestamp)"));
    }
}

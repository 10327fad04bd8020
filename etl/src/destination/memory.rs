use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::destination::Destination;
use crate::error::EtlResult;
use crate::types::{BusinessKey, Record};

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<BusinessKey, Record>,
    batch_sizes: Vec<usize>,
}

/// In-memory destination with the same upsert semantics as the MySQL one.
///
/// Rows are keyed by [`BusinessKey`]. A hit on an existing key only replaces the message, so
/// the stored record keeps the id of the first write.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored rows ordered by business key.
    pub async fn records(&self) -> Vec<Record> {
        self.inner.lock().await.rows.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.rows.is_empty()
    }

    /// Sizes of the non-empty batches written so far, in commit order.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.inner.lock().await.batch_sizes.clone()
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.rows.clear();
        inner.batch_sizes.clear();
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn bulk_upsert(&self, records: Vec<Record>) -> EtlResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        let batch_size = records.len();

        for record in records {
            inner
                .rows
                .entry(record.business_key())
                .and_modify(|existing| existing.message.clone_from(&record.message))
                .or_insert(record);
        }
        inner.batch_sizes.push(batch_size);

        info!(batch_size, total_rows = inner.rows.len(), "upserted batch in memory");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(id: i64, event_type: &str, message: &str) -> Record {
        let date = NaiveDate::from_ymd_opt(2025, 10, 17).unwrap();
        Record {
            id,
            date,
            timestamp: date.and_hms_opt(12, 0, 0).unwrap(),
            device_type: "sensor-a".to_string(),
            event_type: event_type.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn replaying_a_batch_is_idempotent() {
        let destination = MemoryDestination::new();
        let batch = vec![record(1, "a", "X"), record(2, "b", "Y")];

        destination.bulk_upsert(batch.clone()).await.unwrap();
        let first = destination.records().await;
        destination.bulk_upsert(batch).await.unwrap();

        assert_eq!(destination.records().await, first);
        assert_eq!(destination.batch_sizes().await, vec![2, 2]);
    }

    #[tokio::test]
    async fn conflicting_key_overwrites_only_message() {
        let destination = MemoryDestination::new();

        destination
            .bulk_upsert(vec![record(1, "a", "OLD"), record(7, "a", "NEW")])
            .await
            .unwrap();

        let records = destination.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].message, "NEW");
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let destination = MemoryDestination::new();

        destination.bulk_upsert(Vec::new()).await.unwrap();

        assert!(destination.is_empty().await);
        assert!(destination.batch_sizes().await.is_empty());
    }
}

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::EtlResult;
use crate::source::Source;
use crate::types::{IdBounds, KeyRange, Record, TimeWindow};

/// In-memory source for tests and local experiments.
///
/// Records are kept sorted by id, mirroring a table scanned through its primary key.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Arc<RwLock<Vec<Record>>>,
}

impl MemorySource {
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by_key(|record| record.id);

        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Adds records, keeping id order.
    pub async fn insert(&self, new_records: Vec<Record>) {
        let mut records = self.records.write().await;
        records.extend(new_records);
        records.sort_by_key(|record| record.id);
    }

    pub async fn records(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }
}

impl Source for MemorySource {
    fn name() -> &'static str {
        "memory"
    }

    async fn query_range(&self, window: &TimeWindow) -> EtlResult<IdBounds> {
        let records = self.records.read().await;

        let mut ids = records
            .iter()
            .filter(|record| window.contains(record.timestamp))
            .map(|record| record.id);

        let Some(first) = ids.next() else {
            return Ok(IdBounds::empty());
        };
        let (min_id, max_id) = ids.fold((first, first), |(min, max), id| (min.min(id), max.max(id)));

        Ok(IdBounds::new(min_id, max_id))
    }

    async fn query_page(
        &self,
        range: &KeyRange,
        window: &TimeWindow,
        cursor: i64,
        page_size: u32,
    ) -> EtlResult<Vec<Record>> {
        let records = self.records.read().await;

        let page = records
            .iter()
            .filter(|record| record.id > cursor && record.id <= range.end)
            .filter(|record| window.contains(record.timestamp))
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(page)
    }
}

use chrono::{NaiveDate, NaiveDateTime};

/// Columns written to the target table, in bind order.
pub const TARGET_COLUMNS: [&str; 5] = ["date", "timestamp", "device_type", "event_type", "message"];

/// Columns forming the target's unique key. A write whose key already exists updates the row.
pub const BUSINESS_KEY_COLUMNS: [&str; 4] = ["date", "timestamp", "device_type", "event_type"];

/// Column overwritten when a write hits an existing business key.
pub const OVERWRITE_COLUMN: &str = "message";

/// One time-stamped event.
///
/// `id` is assigned by the source and only used as the extraction cursor; it is never written
/// to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub date: NaiveDate,
    /// Second precision.
    pub timestamp: NaiveDateTime,
    pub device_type: String,
    pub event_type: String,
    pub message: String,
}

impl Record {
    pub fn business_key(&self) -> BusinessKey {
        BusinessKey {
            date: self.date,
            timestamp: self.timestamp,
            device_type: self.device_type.clone(),
            event_type: self.event_type.clone(),
        }
    }
}

/// Identity of a record in the target store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusinessKey {
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
    pub device_type: String,
    pub event_type: String,
}

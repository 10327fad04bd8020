use std::future::Future;

use crate::error::EtlResult;
use crate::types::Record;

/// Write side of the pipeline.
///
/// Every loader calls [`Destination::bulk_upsert`] concurrently on a shared instance.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Writes `records` as one atomic, idempotent upsert.
    ///
    /// Records whose business key (`date`, `timestamp`, `device_type`, `event_type`) already
    /// exists only overwrite `message`. When a key appears twice in `records`, the later one wins.
    /// Either the whole batch is committed or none of it is. An empty batch is a no-op.
    fn bulk_upsert(&self, records: Vec<Record>) -> impl Future<Output = EtlResult<()>> + Send;
}

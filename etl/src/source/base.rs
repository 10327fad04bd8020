use std::future::Future;

use crate::error::EtlResult;
use crate::types::{IdBounds, KeyRange, Record, TimeWindow};

/// Read side of the pipeline.
///
/// Implementations are shared by every extractor and the range resolver, so they must tolerate
/// concurrent calls. Each call is expected to borrow a connection only for its own duration.
pub trait Source {
    /// Returns the name of the source.
    fn name() -> &'static str;

    /// Returns the smallest and largest key among records whose timestamp lies in `window`.
    ///
    /// A window without records yields [`IdBounds::empty`].
    fn query_range(&self, window: &TimeWindow) -> impl Future<Output = EtlResult<IdBounds>> + Send;

    /// Returns up to `page_size` records with `cursor < id <= range.end` and a timestamp inside
    /// `window`, ordered by ascending id.
    ///
    /// An empty page means the range is exhausted.
    fn query_page(
        &self,
        range: &KeyRange,
        window: &TimeWindow,
        cursor: i64,
        page_size: u32,
    ) -> impl Future<Output = EtlResult<Vec<Record>>> + Send;
}

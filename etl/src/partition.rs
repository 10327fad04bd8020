//! Resolution of a time window to a key interval and its split across extractors.

use tracing::info;

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::source::Source;
use crate::types::{IdBounds, KeyRange, TimeWindow};

/// Asks the source for the key interval covering `window`.
///
/// Any failure is reported as [`ErrorKind::RangeUnavailable`] with the source error attached.
pub async fn resolve_id_bounds<S>(source: &S, window: &TimeWindow) -> EtlResult<IdBounds>
where
    S: Source,
{
    let bounds = source.query_range(window).await.map_err(|err| {
        etl_error!(
            ErrorKind::RangeUnavailable,
            "Failed to resolve the key range of the time window",
            format!(
                "window {window}, cause: [{:?}] {}",
                err.kind(),
                err.description()
            ),
            source: err
        )
    })?;

    info!(source = S::name(), %window, %bounds, "resolved key range");

    Ok(bounds)
}

/// Splits `bounds` into `count` contiguous, disjoint, inclusive ranges.
///
/// Each range gets `span / count` keys and the last one also absorbs the remainder. When the
/// span is smaller than `count` the leading ranges are empty. Empty bounds or a zero count
/// produce no ranges.
pub fn partition_key_space(bounds: IdBounds, count: usize) -> Vec<KeyRange> {
    if bounds.is_empty() || count == 0 {
        return Vec::new();
    }

    // i128 keeps `max - min + 1` from overflowing for extreme keys.
    let min = bounds.min_id as i128;
    let max = bounds.max_id as i128;
    let parts = count as i128;
    let share = (max - min + 1) / parts;

    (0..parts)
        .map(|i| {
            let start = min + i * share;
            let end = if i == parts - 1 {
                max
            } else {
                min + (i + 1) * share - 1
            };

            KeyRange::new(start as i64, end as i64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;

    fn assert_partition_covers(bounds: IdBounds, ranges: &[KeyRange]) {
        let non_empty: Vec<_> = ranges.iter().filter(|r| !r.is_empty()).collect();

        assert_eq!(non_empty.first().unwrap().start, bounds.min_id);
        assert_eq!(non_empty.last().unwrap().end, bounds.max_id);
        for pair in non_empty.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }

        let total: u64 = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(total, (bounds.max_id - bounds.min_id + 1) as u64);
    }

    #[test]
    fn even_split() {
        let ranges = partition_key_space(IdBounds::new(1, 12), 2);

        assert_eq!(ranges, vec![KeyRange::new(1, 6), KeyRange::new(7, 12)]);
    }

    #[test]
    fn last_range_absorbs_remainder() {
        let ranges = partition_key_space(IdBounds::new(1, 10), 3);

        assert_eq!(
            ranges,
            vec![KeyRange::new(1, 3), KeyRange::new(4, 6), KeyRange::new(7, 10)]
        );
    }

    #[test]
    fn span_smaller_than_count_leaves_leading_ranges_empty() {
        let ranges = partition_key_space(IdBounds::new(5, 6), 4);

        assert_eq!(ranges.len(), 4);
        assert!(ranges[..3].iter().all(|r| r.is_empty()));
        assert_eq!(ranges[3], KeyRange::new(5, 6));
    }

    #[test]
    fn partitions_are_complete_and_disjoint() {
        for (min, max) in [(1, 1), (1, 100), (17, 1_000_003), (-50, 50), (0, 9)] {
            for count in 1..=9 {
                let bounds = IdBounds::new(min, max);
                let ranges = partition_key_space(bounds, count);

                assert_eq!(ranges.len(), count);
                assert_partition_covers(bounds, &ranges);
            }
        }
    }

    #[test]
    fn extreme_keys_do_not_overflow() {
        let bounds = IdBounds::new(i64::MIN + 1, i64::MAX);

        let ranges = partition_key_space(bounds, 4);

        assert_eq!(ranges.first().unwrap().start, i64::MIN + 1);
        assert_eq!(ranges.last().unwrap().end, i64::MAX);
    }

    #[test]
    fn empty_bounds_produce_no_ranges() {
        assert!(partition_key_space(IdBounds::empty(), 4).is_empty());
    }

    #[tokio::test]
    async fn resolving_an_empty_source_yields_empty_bounds() {
        let window = TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap();

        let bounds = resolve_id_bounds(&MemorySource::default(), &window)
            .await
            .unwrap();

        assert!(bounds.is_empty());
    }
}

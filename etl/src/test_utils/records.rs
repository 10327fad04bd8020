use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::types::{Record, TimeWindow};

const DEVICE_TYPES: [&str; 4] = ["sensor", "gateway", "camera", "thermostat"];
const EVENT_TYPES: [&str; 4] = ["heartbeat", "alarm", "reading", "reboot"];

/// Builds a record whose `date` is taken from `timestamp`.
pub fn record(
    id: i64,
    timestamp: NaiveDateTime,
    device_type: &str,
    event_type: &str,
    message: &str,
) -> Record {
    Record {
        id,
        date: timestamp.date(),
        timestamp,
        device_type: device_type.to_owned(),
        event_type: event_type.to_owned(),
        message: message.to_owned(),
    }
}

/// Generates `count` records with ids `first_id..first_id + count`, all inside `window`.
///
/// Timestamps are one second apart starting at the window start, so business keys are unique as
/// long as the window is long enough. Device types, event types and messages are random but
/// reproducible for a given `seed`.
///
/// # Panics
///
/// Panics if the window is shorter than `count` seconds.
pub fn generate_records(first_id: i64, count: usize, window: &TimeWindow, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|offset| {
            let timestamp = window.start() + Duration::seconds(offset as i64);
            assert!(
                window.contains(timestamp),
                "window {window} is too short for {count} records"
            );

            let device_type = DEVICE_TYPES.choose(&mut rng).copied().unwrap_or("sensor");
            let event_type = EVENT_TYPES.choose(&mut rng).copied().unwrap_or("reading");
            let message = random_message(&mut rng);

            record(
                first_id + offset as i64,
                timestamp,
                device_type,
                event_type,
                &message,
            )
        })
        .collect()
}

/// Generates `count` records timestamped just before `window`, with ids starting at `first_id`.
pub fn generate_records_before(first_id: i64, count: usize, window: &TimeWindow) -> Vec<Record> {
    (0..count)
        .map(|offset| {
            let timestamp = window.start() - Duration::seconds(offset as i64 + 1);
            record(first_id + offset as i64, timestamp, "sensor", "stale", "outside window")
        })
        .collect()
}

fn random_message(rng: &mut StdRng) -> String {
    let len = rng.gen_range(8..32);
    (0..len)
        .map(|_| match rng.gen_range(0..10) {
            0 => ' ',
            1 => 'é',
            _ => rng.gen_range(b'a'..=b'z') as char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_records_have_unique_business_keys() {
        let window = TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap();
        let records = generate_records(1, 1_000, &window, 7);

        let keys: HashSet<_> = records.iter().map(Record::business_key).collect();
        assert_eq!(keys.len(), 1_000);
        assert!(records.iter().all(|record| window.contains(record.timestamp)));
        assert_eq!(records.last().map(|record| record.id), Some(1_000));
        assert_eq!(records, generate_records(1, 1_000, &window, 7));
    }

    #[test]
    fn records_before_window_are_excluded() {
        let window = TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap();
        let records = generate_records_before(100, 5, &window);

        assert!(records.iter().all(|record| !window.contains(record.timestamp)));
    }
}

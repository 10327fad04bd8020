//! Per-record transformations applied between extraction and loading.

use crate::types::Record;

/// A pure, stateless function applied to every record.
///
/// Transformations see one record at a time and must not fail.
pub trait Transform {
    fn name(&self) -> &'static str;

    fn apply(&self, record: Record) -> Record;
}

/// Uppercases the message using full Unicode case mapping. Other fields are untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct UppercaseMessage;

impl Transform for UppercaseMessage {
    fn name(&self) -> &'static str {
        "uppercase_message"
    }

    fn apply(&self, mut record: Record) -> Record {
        record.message = record.message.to_uppercase();
        record
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(message: &str) -> Record {
        let date = NaiveDate::from_ymd_opt(2025, 10, 17).unwrap();
        Record {
            id: 1,
            date,
            timestamp: date.and_hms_opt(0, 0, 0).unwrap(),
            device_type: "sensor-a".to_string(),
            event_type: "boot".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn uppercases_only_the_message() {
        let original = record("device ok: 42%");

        let transformed = UppercaseMessage.apply(original.clone());

        assert_eq!(transformed.message, "DEVICE OK: 42%");
        assert_eq!(transformed.device_type, original.device_type);
        assert_eq!(transformed.event_type, original.event_type);
        assert_eq!(transformed.id, original.id);
    }

    #[test]
    fn uses_unicode_case_mapping() {
        assert_eq!(UppercaseMessage.apply(record("straße éa")).message, "STRASSE ÉA");
    }

    #[test]
    fn is_idempotent() {
        let once = UppercaseMessage.apply(record("MiXeD"));
        let twice = UppercaseMessage.apply(once.clone());

        assert_eq!(once, twice);
    }
}

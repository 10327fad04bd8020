use std::fmt;

use chrono::NaiveDateTime;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Format used to parse and print window bounds.
pub const WINDOW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Half-open time interval `[start, end)` selecting the records to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a window, rejecting `end < start`. An equal start and end is a valid, empty window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> EtlResult<Self> {
        if end < start {
            bail!(
                ErrorKind::ConfigError,
                "Time window ends before it starts",
                format!(
                    "start {} is after end {}",
                    start.format(WINDOW_TIME_FORMAT),
                    end.format(WINDOW_TIME_FORMAT)
                )
            );
        }

        Ok(Self { start, end })
    }

    /// Parses both bounds with [`WINDOW_TIME_FORMAT`].
    pub fn parse(start: &str, end: &str) -> EtlResult<Self> {
        let start = NaiveDateTime::parse_from_str(start, WINDOW_TIME_FORMAT)?;
        let end = NaiveDateTime::parse_from_str(end, WINDOW_TIME_FORMAT)?;

        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format(WINDOW_TIME_FORMAT),
            self.end.format(WINDOW_TIME_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn window_is_half_open() {
        let window = TimeWindow::parse("2025-10-17 00:00:00", "2025-10-18 00:00:00").unwrap();

        assert!(window.contains(window.start()));
        assert!(!window.contains(window.end()));
        assert_eq!(
            window.to_string(),
            "[2025-10-17 00:00:00, 2025-10-18 00:00:00)"
        );
    }

    #[test]
    fn reversed_window_is_rejected() {
        let err = TimeWindow::parse("2025-10-18 00:00:00", "2025-10-17 00:00:00").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn malformed_bound_is_a_conversion_error() {
        let err = TimeWindow::parse("2025-10-18", "2025-10-19 00:00:00").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }
}

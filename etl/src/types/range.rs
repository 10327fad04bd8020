use std::fmt;

/// Smallest and largest key of the records inside a time window.
///
/// `max_id < min_id` means the window holds no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBounds {
    pub min_id: i64,
    pub max_id: i64,
}

impl IdBounds {
    pub fn new(min_id: i64, max_id: i64) -> Self {
        Self { min_id, max_id }
    }

    /// Bounds of a window without records.
    pub fn empty() -> Self {
        Self {
            min_id: 0,
            max_id: -1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_id < self.min_id
    }
}

impl fmt::Display for IdBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<empty>")
        } else {
            write!(f, "[{}, {}]", self.min_id, self.max_id)
        }
    }
}

/// Inclusive key interval `[start, end]` assigned to one extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    pub start: i64,
    pub end: i64,
}

impl KeyRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Number of keys in the range.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.end as i128 - self.start as i128 + 1) as u64
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.start <= id && id <= self.end
    }

    /// Cursor value before the first page: every key in the range is greater than it.
    pub fn initial_cursor(&self) -> i64 {
        self.start.saturating_sub(1)
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

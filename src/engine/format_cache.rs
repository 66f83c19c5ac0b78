//! Format Cache - memoized period labels.
//!
//! The same handful of period boundaries come back on every scroll and
//! resize, so each raw timestamp is formatted once and reused. Entries are
//! never evicted; the cache is scoped to one pattern and one grid instance.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::DateTime;

use crate::types::Timestamp;

/// Formats a timestamp with a pattern.
///
/// Implemented for [`ChronoFormatter`] and for any
/// `Fn(Timestamp, &str) -> String` closure.
pub trait TimeFormatter {
    fn format(&self, timestamp: Timestamp, pattern: &str) -> String;
}

impl<F> TimeFormatter for F
where
    F: Fn(Timestamp, &str) -> String,
{
    fn format(&self, timestamp: Timestamp, pattern: &str) -> String {
        self(timestamp, pattern)
    }
}

/// strftime formatting in UTC via chrono.
///
/// Out-of-range timestamps and invalid patterns fall back to the raw
/// millisecond value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoFormatter;

impl TimeFormatter for ChronoFormatter {
    fn format(&self, timestamp: Timestamp, pattern: &str) -> String {
        let Some(dt) = DateTime::from_timestamp_millis(timestamp) else {
            log::debug!("timestamp {timestamp} out of range, using raw value");
            return timestamp.to_string();
        };

        let mut out = String::new();
        if write!(out, "{}", dt.format(pattern)).is_err() {
            log::debug!("invalid time pattern {pattern:?}, using raw value");
            return timestamp.to_string();
        }
        out
    }
}

/// Timestamp -> formatted label, for one pattern.
#[derive(Debug, Clone)]
pub struct FormatCache {
    pattern: String,
    labels: HashMap<Timestamp, String>,
}

impl FormatCache {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            labels: HashMap::new(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Switch patterns. Labels formatted with the old one are dropped.
    pub fn set_pattern(&mut self, pattern: &str) {
        if self.pattern != pattern {
            self.pattern = pattern.to_string();
            self.labels.clear();
        }
    }

    /// Cached label for `timestamp`, formatting it on first use.
    pub fn get_or_format(&mut self, timestamp: Timestamp, formatter: &dyn TimeFormatter) -> &str {
        let pattern = &self.pattern;
        self.labels
            .entry(timestamp)
            .or_insert_with(|| formatter.format(timestamp, pattern))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DEFAULT_CELL_ID_FORMAT;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[test]
    fn test_chrono_formatter_minute_resolution() {
        let f = ChronoFormatter;
        assert_eq!(f.format(0, DEFAULT_CELL_ID_FORMAT), "1970-01-01 00:00");
        assert_eq!(f.format(60_000, DEFAULT_CELL_ID_FORMAT), "1970-01-01 00:01");
        // Seconds are below the resolution.
        assert_eq!(f.format(59_999, DEFAULT_CELL_ID_FORMAT), "1970-01-01 00:00");
    }

    #[test]
    fn test_chrono_formatter_out_of_range() {
        assert_eq!(ChronoFormatter.format(i64::MAX, "%Y"), i64::MAX.to_string());
    }

    #[test]
    fn test_cache_formats_once() {
        let calls = Cell::new(0);
        let formatter = |ts: Timestamp, _: &str| {
            calls.set(calls.get() + 1);
            format!("t{ts}")
        };

        let mut cache = FormatCache::new("p");
        let first = cache.get_or_format(60_000, &formatter).to_string();
        let second = cache.get_or_format(60_000, &formatter).to_string();

        assert_eq!(first, "t60000");
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_passes_pattern() {
        let formatter = |ts: Timestamp, pattern: &str| format!("{pattern}/{ts}");
        let mut cache = FormatCache::new("%H");
        assert_eq!(cache.get_or_format(1, &formatter), "%H/1");
    }

    #[test]
    fn test_pattern_change_drops_labels() {
        let formatter = |ts: Timestamp, pattern: &str| format!("{pattern}/{ts}");
        let mut cache = FormatCache::new("a");
        cache.get_or_format(1, &formatter);

        cache.set_pattern("a");
        assert_eq!(cache.len(), 1);

        cache.set_pattern("b");
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_format(1, &formatter), "b/1");
    }
}

//! Bounded newest-first list of history entries.

use std::collections::VecDeque;

use whatref_core::HistoryEntry;

/// Newest-first ring of at most `capacity` entries.
///
/// Inserting into a full buffer drops the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build from entries already ordered newest-first, keeping the
    /// `capacity` newest.
    pub fn from_entries(entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        let mut entries: VecDeque<HistoryEntry> = entries.into();
        entries.truncate(capacity);
        Self { entries, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert as newest. Returns the evicted entry, if any.
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        if self.capacity == 0 {
            return Some(entry);
        }
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Up to `limit` entries, newest first.
    pub fn newest(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let limit = limit.unwrap_or(self.capacity);
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn entry(n: i64) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::now_v7(),
            result: format!("1. Reference Number: REF-{}", n),
            thumbnail: None,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(n),
        }
    }

    #[test]
    fn test_eleventh_insert_evicts_oldest() {
        let mut buffer = HistoryBuffer::new(10);
        for n in 0..10 {
            assert!(buffer.push(entry(n)).is_none());
        }
        let evicted = buffer.push(entry(10)).expect("oldest should be evicted");
        assert_eq!(evicted.result, "1. Reference Number: REF-0");

        let newest = buffer.newest(None);
        assert_eq!(newest.len(), 10);
        let refs: Vec<_> = newest.iter().map(|e| e.result.clone()).collect();
        let expected: Vec<_> = (1..=10)
            .rev()
            .map(|n| format!("1. Reference Number: REF-{}", n))
            .collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn test_limit_applies_newest_first() {
        let mut buffer = HistoryBuffer::new(10);
        for n in 0..5 {
            buffer.push(entry(n));
        }
        let two = buffer.newest(Some(2));
        assert_eq!(two[0].result, "1. Reference Number: REF-4");
        assert_eq!(two[1].result, "1. Reference Number: REF-3");
    }

    #[test]
    fn test_from_entries_truncates_to_capacity() {
        let entries: Vec<_> = (0..15).rev().map(entry).collect();
        let buffer = HistoryBuffer::from_entries(entries, 10);
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.newest(Some(1))[0].result, "1. Reference Number: REF-14");
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut buffer = HistoryBuffer::new(0);
        assert!(buffer.push(entry(1)).is_some());
        assert!(buffer.is_empty());
    }
}

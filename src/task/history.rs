//! Bounded in-memory buffers used for dispatch history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Index;

use crate::task::types::TaskId;

/// Buffer that expels its oldest entries once it grows past `max_size`.
///
/// Overflow removes `max_size / 16` entries in one go rather than one per
/// append.
#[derive(Debug, Clone)]
pub struct FifoBuffer<T> {
    entries: VecDeque<T>,
    max_size: usize,
    /// Total number of entries ever appended
    pub entry_id: u64,
}

impl<T> FifoBuffer<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size: max_size.max(1),
            entry_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter()
    }

    /// Drop the `n` oldest entries
    pub fn remove_first(&mut self, n: usize) {
        let n = n.min(self.entries.len());
        self.entries.drain(..n);
    }

    pub fn append(&mut self, entry: T) {
        self.entries.push_back(entry);
        if self.entries.len() > self.max_size {
            self.remove_first((self.max_size / 16).max(1));
        }
        self.entry_id += 1;
    }
}

impl<T> Default for FifoBuffer<T> {
    fn default() -> Self {
        Self::new(crate::env::defaults::HISTORY_SIZE)
    }
}

impl<T> Index<usize> for FifoBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.entries[index]
    }
}

/// A [`FifoBuffer`] whose entries carry the wall-clock time they were added
#[derive(Debug, Clone)]
pub struct TimestampedBuffer<T> {
    inner: FifoBuffer<(DateTime<Utc>, T)>,
}

impl<T> Default for TimestampedBuffer<T> {
    fn default() -> Self {
        Self {
            inner: FifoBuffer::default(),
        }
    }
}

impl<T> TimestampedBuffer<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: FifoBuffer::new(max_size),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn entry_id(&self) -> u64 {
        self.inner.entry_id
    }

    pub fn append(&mut self, entry: T) {
        self.append_at(entry, Utc::now());
    }

    pub fn append_at(&mut self, entry: T, at: DateTime<Utc>) {
        self.inner.append((at, entry));
    }

    pub fn remove_first(&mut self, n: usize) {
        self.inner.remove_first(n);
    }

    pub fn last(&self) -> Option<(&DateTime<Utc>, &T)> {
        self.inner.last().map(|(at, entry)| (at, entry))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&DateTime<Utc>, &T)> + '_ {
        self.inner.iter().map(|(at, entry)| (at, entry))
    }
}

/// One command handed to the inserter
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DispatchRecord {
    pub task_id: TaskId,
    pub cmd: String,
    pub queue: String,
    /// Seconds the task spent pending before it was sent
    pub waited_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_buffer_trims_in_chunks() {
        let mut buffer = FifoBuffer::new(32);
        for i in 0..32 {
            buffer.append(i);
        }
        assert_eq!(buffer.len(), 32);
        assert_eq!(buffer[0], 0);

        // One more pushes it over: 32 / 16 = 2 entries expelled
        buffer.append(32);
        assert_eq!(buffer.len(), 31);
        assert_eq!(buffer[0], 2);
        assert_eq!(buffer.last(), Some(&32));
        assert_eq!(buffer.entry_id, 33);
    }

    #[test]
    fn test_fifo_buffer_small_capacity_still_trims() {
        let mut buffer = FifoBuffer::new(4);
        for i in 0..10 {
            buffer.append(i);
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_timestamped_buffer_keeps_timestamps_aligned() {
        let mut buffer = TimestampedBuffer::new(16);
        let first = Utc::now();
        buffer.append_at("look", first);
        buffer.append("north");
        buffer.remove_first(1);

        assert_eq!(buffer.len(), 1);
        let (at, entry) = buffer.last().expect("one entry left");
        assert_eq!(*entry, "north");
        assert!(*at >= first);
        assert_eq!(buffer.entry_id(), 2);
    }

    #[test]
    fn test_default_history_holds_records_without_default() {
        let mut history: TimestampedBuffer<DispatchRecord> = TimestampedBuffer::default();
        assert!(history.is_empty());

        history.append(DispatchRecord {
            task_id: 1,
            cmd: "look".to_string(),
            queue: "any".to_string(),
            waited_secs: 0.0,
        });
        assert_eq!(history.len(), 1);
        assert_eq!(history.entry_id(), 1);
    }
}

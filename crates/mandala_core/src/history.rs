//! Bounded undo/redo log over document snapshots.
//!
//! # Responsibility
//! - Keep the last `HISTORY_CAPACITY` chart snapshots and a cursor.
//!
//! # Invariants
//! - The log is never empty; the entry at the cursor is the live state.
//! - Recording after an undo discards the redo tail.
//! - Navigation and view state are never recorded here.

use std::collections::VecDeque;

/// Maximum number of snapshots kept in the log.
pub const HISTORY_CAPACITY: usize = 64;

/// Snapshot log with an undo/redo cursor.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    cursor: usize,
    capacity: usize,
}

#[allow(clippy::len_without_is_empty)]
impl<T: Clone> History<T> {
    /// Creates a log holding only `current`.
    pub fn new(current: T) -> Self {
        Self::with_capacity(current, HISTORY_CAPACITY)
    }

    /// Creates a log with a custom bound (minimum one entry).
    pub fn with_capacity(current: T, capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.max(1));
        entries.push_back(current);
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Appends a new live snapshot, dropping the redo tail and, when full,
    /// the oldest entry.
    pub fn record(&mut self, snapshot: T) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Moves one step back and returns the snapshot now live.
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Moves one step forward and returns the snapshot now live.
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// Resets the log so it only holds `current`.
    pub fn clear(&mut self, current: T) {
        self.entries.clear();
        self.entries.push_back(current);
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    pub fn redo_depth(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }

    /// Number of snapshots held, including the live one; never zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::History;

    #[test]
    fn record_after_undo_drops_redo_tail() {
        let mut history = History::new(0);
        history.record(1);
        history.record(2);
        assert_eq!(history.undo(), Some(&1));
        history.record(3);
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(&1));
        assert_eq!(history.undo(), Some(&0));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn capacity_evicts_oldest_snapshot() {
        let mut history = History::with_capacity(0, 3);
        for value in 1..=5 {
            history.record(value);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo(), Some(&4));
        assert_eq!(history.undo(), Some(&3));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn clear_keeps_only_current() {
        let mut history = History::new("a");
        history.record("b");
        history.clear("c");
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some(&"c"));
        assert!(!history.can_undo());
    }

    #[test]
    fn zero_capacity_still_holds_live_snapshot() {
        let mut history = History::with_capacity(0, 0);
        history.record(1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), Some(&1));
        assert_eq!(history.undo(), None);
    }
}

//! Bounded undo/redo log of serialized document snapshots.

use std::collections::VecDeque;

use tracing::debug;
use tracing::trace;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Linear snapshot history with a cursor.
///
/// Saving after an undo discards everything past the cursor. While the guard
/// is set (right after a restore) saves are ignored, so the restore itself is
/// never recorded as a new entry.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<String>,
    index: Option<usize>,
    limit: usize,
    guarded: bool,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: None,
            limit: limit.max(1),
            guarded: false,
        }
    }

    /// Records `snapshot` unless the guard is set or it equals the entry at
    /// the cursor. Returns whether an entry was appended.
    pub fn save(&mut self, snapshot: impl Into<String>) -> bool {
        if self.guarded {
            trace!("history save suppressed by restore guard");
            return false;
        }

        let snapshot = snapshot.into();
        if self.current() == Some(snapshot.as_str()) {
            return false;
        }

        let keep = self.index.map_or(0, |index| index + 1);
        self.entries.truncate(keep);
        self.entries.push_back(snapshot);

        if self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.index = Some(self.entries.len() - 1);
        debug!(entries = self.entries.len(), "history snapshot saved");
        true
    }

    /// Steps back and returns the snapshot to restore. Sets the guard.
    pub fn undo(&mut self) -> Option<&str> {
        let index = self.index.filter(|index| *index > 0)? - 1;
        self.index = Some(index);
        self.guarded = true;
        self.entries.get(index).map(String::as_str)
    }

    /// Steps forward and returns the snapshot to restore. Sets the guard.
    pub fn redo(&mut self) -> Option<&str> {
        let index = self.index?.checked_add(1)?;
        if index >= self.entries.len() {
            return None;
        }
        self.index = Some(index);
        self.guarded = true;
        self.entries.get(index).map(String::as_str)
    }

    pub fn release_guard(&mut self) {
        self.guarded = false;
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|index| index > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index
            .is_some_and(|index| index + 1 < self.entries.len())
    }

    /// Cursor position; `None` before the first save.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.index
            .and_then(|index| self.entries.get(index))
            .map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryLog;

    #[test]
    fn starts_empty_with_no_cursor() {
        let mut history = HistoryLog::default();
        assert_eq!(history.index(), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn identical_snapshots_are_not_duplicated() {
        let mut history = HistoryLog::default();
        assert!(history.save("a"));
        assert!(!history.save("a"));
        assert!(history.save("b"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), Some(1));
    }

    #[test]
    fn evicts_oldest_past_the_limit() {
        let mut history = HistoryLog::new(50);
        for step in 0..51 {
            history.save(format!("s{step}"));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.index(), Some(49));
        assert_eq!(history.entries().next(), Some("s1"));
        assert_eq!(history.current(), Some("s50"));
    }

    #[test]
    fn undo_and_redo_walk_the_cursor() {
        let mut history = HistoryLog::default();
        history.save("a");
        history.save("b");
        history.save("c");

        assert_eq!(history.undo(), Some("b"));
        assert!(history.is_guarded());
        history.release_guard();
        assert_eq!(history.undo(), Some("a"));
        assert_eq!(history.undo(), None);
        assert_eq!(history.index(), Some(0));

        assert_eq!(history.redo(), Some("b"));
        assert_eq!(history.redo(), Some("c"));
        assert_eq!(history.redo(), None);
        assert_eq!(history.index(), Some(2));
    }

    #[test]
    fn guard_swallows_saves_until_released() {
        let mut history = HistoryLog::default();
        history.save("a");
        history.save("b");
        history.undo();
        assert!(!history.save("a-restored"));
        history.release_guard();
        assert!(history.save("a-restored"));
    }

    #[test]
    fn saving_after_undo_discards_redo_tail() {
        let mut history = HistoryLog::default();
        history.save("a");
        history.save("b");
        history.save("c");
        history.undo();
        history.undo();
        history.release_guard();

        assert!(history.save("d"));
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["a", "d"]);
        assert!(!history.can_redo());
        assert_eq!(history.index(), Some(1));
    }
}

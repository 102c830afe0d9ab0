//! Bounded undo/redo history.

/// Maximum number of states kept.
pub const MAX_HISTORY: usize = 5;

/// A linear history of states with a cursor.
///
/// `index` points at the current state. Pushing discards everything after the
/// cursor; once the bound is exceeded the oldest state is dropped and the
/// window slides, so the cursor always ends on the newest entry.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    index: Option<usize>,
    capacity: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// History with a custom bound (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            capacity: capacity.max(1),
        }
    }

    /// Record a new current state.
    pub fn push(&mut self, entry: T) {
        if let Some(index) = self.index {
            self.entries.truncate(index + 1);
        } else {
            self.entries.clear();
        }
        self.entries.push(entry);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.index = Some(self.entries.len() - 1);
    }

    /// Drop everything and start over from `entry`.
    pub fn reset(&mut self, entry: T) {
        self.entries.clear();
        self.index = None;
        self.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
    }

    /// Step back. Returns the state to restore, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&T> {
        match self.index {
            Some(index) if index > 0 => {
                self.index = Some(index - 1);
                self.entries.get(index - 1)
            }
            _ => None,
        }
    }

    /// Step forward. Returns the state to restore, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&T> {
        let next = self.index? + 1;
        if next < self.entries.len() {
            self.index = Some(next);
            self.entries.get(next)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.index, Some(i) if i + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.index?)
    }

    /// Cursor position, `None` when empty.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

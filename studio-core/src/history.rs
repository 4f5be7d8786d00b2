//! Linear undo/redo over named checkpoints.

use std::collections::VecDeque;

use tracing::debug;

/// Default number of undo steps retained.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

#[derive(Debug, Clone)]
struct Entry<S> {
    label: String,
    snapshot: S,
}

/// Bounded linear history of snapshots of `S`.
///
/// Callers `mark` with the state *before* a gesture mutates it; `undo` and
/// `redo` swap the caller's current state with the stored one.
#[derive(Debug, Clone)]
pub struct History<S> {
    undo: VecDeque<Entry<S>>,
    redo: Vec<Entry<S>>,
    max_depth: usize,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl<S> History<S> {
    /// Create a history retaining at most `max_depth` undo steps (min 1).
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record a checkpoint. Discards the redo tail and evicts the oldest
    /// entry once the depth limit is reached.
    pub fn mark(&mut self, label: impl Into<String>, current: S) {
        let label = label.into();
        debug!(label = %label, "History checkpoint");
        self.undo.push_back(Entry {
            label,
            snapshot: current,
        });
        self.redo.clear();
        while self.undo.len() > self.max_depth {
            if let Some(evicted) = self.undo.pop_front() {
                debug!(label = %evicted.label, "History full, evicting oldest checkpoint");
            }
        }
    }

    /// Step back. Returns the state to restore, or `None` at the boundary.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let entry = self.undo.pop_back()?;
        self.redo.push(Entry {
            label: entry.label.clone(),
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Step forward. Returns the state to restore, or `None` at the boundary.
    pub fn redo(&mut self, current: S) -> Option<S> {
        let entry = self.redo.pop()?;
        self.undo.push_back(Entry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Whether `undo` would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether `redo` would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the step `undo` would revert.
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.undo.back().map(|e| e.label.as_str())
    }

    /// Label of the step `redo` would reapply.
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|e| e.label.as_str())
    }

    /// Undo labels, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.undo.iter().map(|e| e.label.as_str())
    }

    /// Number of undo steps available.
    #[must_use]
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    /// Whether there is nothing to undo or redo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }

    /// Maximum retained undo depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop all checkpoints.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = History::default();
        let mut state = 0;
        for step in 1..=3 {
            history.mark(format!("step {step}"), state);
            state = step;
        }
        assert_eq!(history.undo_label(), Some("step 3"));

        while let Some(prev) = history.undo(state) {
            state = prev;
        }
        assert_eq!(state, 0);
        assert!(!history.can_undo());

        while let Some(next) = history.redo(state) {
            state = next;
        }
        assert_eq!(state, 3);
    }

    #[test]
    fn test_mark_discards_redo() {
        let mut history = History::default();
        history.mark("a", 0);
        history.mark("b", 1);
        let restored = history.undo(2).expect("undo");
        assert_eq!(restored, 1);
        assert!(history.can_redo());

        history.mark("c", restored);
        assert!(!history.can_redo());
        assert_eq!(history.redo(5), None);
    }

    #[test]
    fn test_boundaries_are_noops() {
        let mut history: History<u8> = History::default();
        assert_eq!(history.undo(1), None);
        assert_eq!(history.redo(1), None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_depth_evicts_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.mark(format!("{i}"), i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.labels().collect::<Vec<_>>(), vec!["2", "3", "4"]);

        let mut state = 5;
        while let Some(prev) = history.undo(state) {
            state = prev;
        }
        assert_eq!(state, 2);
    }
}

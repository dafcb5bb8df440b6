#![forbid(unsafe_code)]

//! Snapshot-based undo history.
//!
//! Every entry is a full snapshot of the forest state and the selection,
//! taken *after* the labelled edit. The index points at the entry matching
//! the live forest; undo and redo move it and hand back the snapshot to
//! restore.
//!
//! ```text
//! record(init) record(A) record(B) record(connect)
//! ┌────────────────────────────────────────────────┐
//! │ [init, A, B, connect]            index = 3     │
//! └────────────────────────────────────────────────┘
//! undo() x2
//! ┌────────────────────────────────────────────────┐
//! │ [init, A, B, connect]            index = 1     │
//! └────────────────────────────────────────────────┘
//! record(C)  <-- new branch, truncates the redo tail
//! ┌────────────────────────────────────────────────┐
//! │ [init, A, C]                     index = 2     │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `index < entries.len()` whenever the history is non-empty.
//! 2. `entries.len() <= max_depth`; the oldest entries are evicted first.
//! 3. Recording while suppressed is a no-op.

use kataja_core::UndoConfig;
use tracing::debug;

use crate::error::{ForestError, Result};
use crate::selection::SelectionModel;
use crate::state::ForestState;

#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub label: String,
    pub state: ForestState,
    pub selection: SelectionModel,
}

#[derive(Debug, Clone)]
pub struct UndoManager {
    entries: Vec<UndoEntry>,
    index: usize,
    suppressed: u32,
    max_depth: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(&UndoConfig::default())
    }
}

impl UndoManager {
    #[must_use]
    pub fn new(config: &UndoConfig) -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
            suppressed: 0,
            max_depth: config.max_depth.max(1),
        }
    }

    /// Append a snapshot, dropping any redo tail. Returns whether an entry
    /// was recorded.
    pub fn record(&mut self, label: impl Into<String>, state: &ForestState, selection: &SelectionModel) -> bool {
        if self.suppressed > 0 {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        let label = label.into();
        debug!(label = %label, depth = self.entries.len() + 1, "undo record");
        self.entries.push(UndoEntry {
            label,
            state: state.clone(),
            selection: selection.clone(),
        });
        if self.entries.len() > self.max_depth {
            let excess = self.entries.len() - self.max_depth;
            self.entries.drain(..excess);
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Step back; returns the label undone and the snapshot to restore.
    pub fn undo(&mut self) -> Result<(String, &UndoEntry)> {
        if !self.can_undo() {
            return Err(ForestError::NothingToUndo);
        }
        let undone = self.entries[self.index].label.clone();
        self.index -= 1;
        Ok((undone, &self.entries[self.index]))
    }

    /// Step forward; returns the entry to restore.
    pub fn redo(&mut self) -> Result<&UndoEntry> {
        if !self.can_redo() {
            return Err(ForestError::NothingToRedo);
        }
        self.index += 1;
        Ok(&self.entries[self.index])
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.index > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Number of redo steps available.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.entries.len().saturating_sub(self.index + 1)
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels from oldest to newest.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    /// Stop recording until a matching [`resume`](Self::resume). Nests.
    pub fn suppress(&mut self) {
        self.suppressed += 1;
    }

    pub fn resume(&mut self) {
        self.suppressed = self.suppressed.saturating_sub(1);
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed > 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tag: &str) -> ForestState {
        let mut s = ForestState::default();
        s.settings.visualization = tag.to_string();
        s
    }

    fn record(m: &mut UndoManager, label: &str) {
        m.record(label, &state(label), &SelectionModel::new());
    }

    #[test]
    fn undo_redo_walks_the_index() {
        let mut m = UndoManager::default();
        for l in ["init", "A", "B"] {
            record(&mut m, l);
        }
        assert_eq!(m.index(), 2);
        let (undone, entry) = m.undo().unwrap();
        assert_eq!(undone, "B");
        assert_eq!(entry.state.settings.visualization, "A");
        assert_eq!(m.redo().unwrap().label, "B");
        assert_eq!(m.redo().unwrap_err(), ForestError::NothingToRedo);
    }

    #[test]
    fn recording_truncates_the_redo_tail() {
        let mut m = UndoManager::default();
        for l in ["init", "A", "B", "C"] {
            record(&mut m, l);
        }
        m.undo().unwrap();
        m.undo().unwrap();
        record(&mut m, "D");
        assert_eq!(m.labels().collect::<Vec<_>>(), ["init", "A", "D"]);
        assert!(!m.can_redo());
    }

    #[test]
    fn depth_limit_evicts_oldest() {
        let mut m = UndoManager::new(&UndoConfig { max_depth: 2 });
        for l in ["init", "A", "B"] {
            record(&mut m, l);
        }
        assert_eq!(m.labels().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(m.index(), 1);
    }

    #[test]
    fn suppression_nests() {
        let mut m = UndoManager::default();
        record(&mut m, "init");
        m.suppress();
        m.suppress();
        record(&mut m, "hidden");
        m.resume();
        assert!(m.is_suppressed());
        m.resume();
        record(&mut m, "seen");
        assert_eq!(m.labels().collect::<Vec<_>>(), ["init", "seen"]);
    }

    #[test]
    fn empty_history_cannot_undo() {
        let mut m = UndoManager::default();
        assert_eq!(m.undo().unwrap_err(), ForestError::NothingToUndo);
        record(&mut m, "init");
        assert!(m.undo().is_err(), "the first entry is the floor");
    }
}

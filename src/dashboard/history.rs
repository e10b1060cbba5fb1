use crate::dashboard::grid::GridLayout;
use serde_json::Value;
use std::collections::VecDeque;

pub const DEFAULT_UNDO_LIMIT: usize = 20;

/// Layout state captured before an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub grid_layout: GridLayout,
    pub advanced_section_order: Option<Value>,
}

/// Bounded undo/redo stacks of layout snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutHistory {
    undo_stack: VecDeque<LayoutSnapshot>,
    redo_stack: Vec<LayoutSnapshot>,
    limit: usize,
}

impl Default for LayoutHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_UNDO_LIMIT)
    }
}

impl LayoutHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state before a new edit. Clears the redo branch.
    pub fn commit(&mut self, snapshot: LayoutSnapshot) {
        self.push_undo(snapshot);
        self.redo_stack.clear();
    }

    /// Pop the snapshot to restore, parking `current` on the redo stack.
    pub fn undo(&mut self, current: LayoutSnapshot) -> Option<LayoutSnapshot> {
        let snapshot = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(snapshot)
    }

    pub fn redo(&mut self, current: LayoutSnapshot) -> Option<LayoutSnapshot> {
        let snapshot = self.redo_stack.pop()?;
        self.push_undo(current);
        Some(snapshot)
    }

    /// Reverse an [`undo`](Self::undo) whose result could not be saved.
    pub fn revert_undo(&mut self, restored: LayoutSnapshot) {
        self.redo_stack.pop();
        self.push_undo(restored);
    }

    /// Reverse a [`redo`](Self::redo) whose result could not be saved.
    pub fn revert_redo(&mut self, restored: LayoutSnapshot) {
        self.undo_stack.pop_back();
        self.redo_stack.push(restored);
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    fn push_undo(&mut self, snapshot: LayoutSnapshot) {
        if self.undo_stack.len() == self.limit {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(snapshot);
    }
}

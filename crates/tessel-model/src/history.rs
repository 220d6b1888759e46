//! Undo/redo history.
//!
//! Each accepted operation is recorded as a [`HistoryEntry`] holding the
//! resolved forward operation and its inverse. Undo applies the inverse of
//! the newest undo entry; redo re-applies the forward operation of the newest
//! redo entry. Recording a fresh edit clears the redo stack.
//!
//! The undo stack is bounded: once it holds `limit` entries the oldest one is
//! discarded, and that edit can no longer be undone.
//!
//! # Example
//!
//! ```
//! use tessel_model::entity::EntityId;
//! use tessel_model::history::History;
//! use tessel_model::operation::Operation;
//! use serde_json::json;
//!
//! let id = EntityId::new("a");
//! let mut history = History::with_limit(2);
//! for x in 0..3 {
//!     history.record(
//!         Operation::change(&id, "x", json!(x + 1)),
//!         Operation::change(&id, "x", json!(x)),
//!     );
//! }
//! assert_eq!(history.undo_len(), 2);
//! assert_eq!(history.undo_label().as_deref(), Some("Change x of a"));
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// Default maximum number of undoable steps.
pub const DEFAULT_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One undoable step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The operation as applied.
    pub forward: Operation,
    /// The operation that reverts `forward`.
    pub inverse: Operation,
    /// Monotonic sequence number, unique within one history.
    pub sequence: u64,
}

impl HistoryEntry {
    pub fn label(&self) -> String {
        self.forward.describe()
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Bounded undo stack plus redo stack.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limit: usize,
    next_sequence: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history keeping at most `limit` undo steps. A limit of zero keeps
    /// none.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
            next_sequence: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record a fresh edit. Clears the redo stack.
    pub fn record(&mut self, forward: Operation, inverse: Operation) {
        self.redo.clear();
        let entry = self.entry(forward, inverse);
        self.push_undo(entry);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Label of the step [`undo`](crate::engine::OperationEngine::undo) would revert.
    pub fn undo_label(&self) -> Option<String> {
        self.undo.back().map(HistoryEntry::label)
    }

    /// Label of the step [`redo`](crate::engine::OperationEngine::redo) would re-apply.
    pub fn redo_label(&self) -> Option<String> {
        self.redo.last().map(HistoryEntry::label)
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo.iter()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    // -- engine plumbing ----------------------------------------------------

    pub(crate) fn entry(&mut self, forward: Operation, inverse: Operation) -> HistoryEntry {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        HistoryEntry {
            forward,
            inverse,
            sequence,
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop_back()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    /// Push onto the undo stack without touching redo.
    pub(crate) fn push_undo(&mut self, entry: HistoryEntry) {
        if self.limit == 0 {
            return;
        }
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub(crate) fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

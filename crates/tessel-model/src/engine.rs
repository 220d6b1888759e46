//! The operation engine: the single mutation path for a [`Document`].
//!
//! [`OperationEngine::apply`] validates and applies an [`Operation`], records
//! it in the [`History`], marks the document dirty and emits exactly one
//! [`ChangeEvent`]. A rejected operation changes nothing, emits nothing and
//! leaves the history alone.
//!
//! Undo and redo go through the same path, so listeners observe them like
//! any other edit.

use tracing::{debug, error, warn};

use crate::asset::AssetTable;
use crate::document::{ChangeEvent, Document, ListenerId};
use crate::history::{History, DEFAULT_LIMIT};
use crate::operation::{self, OpError, Operation};

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`OperationEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of undoable steps. Older steps are discarded.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationEngine
// ---------------------------------------------------------------------------

/// Owns a document and its undo/redo history.
#[derive(Debug)]
pub struct OperationEngine {
    document: Document,
    history: History,
}

impl OperationEngine {
    /// Wrap a document with the default configuration.
    pub fn new(document: Document) -> Self {
        Self::with_config(document, EngineConfig::default())
    }

    pub fn with_config(document: Document, config: EngineConfig) -> Self {
        Self {
            document,
            history: History::with_limit(config.history_limit),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Give the document back, dropping the history.
    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Apply an edit and record it for undo.
    pub fn apply(&mut self, op: Operation) -> Result<(), OpError> {
        let applied = match operation::apply(&mut self.document, &op) {
            Ok(applied) => applied,
            Err(err) => {
                warn!(operation = %op.describe(), error = %err, "operation rejected");
                return Err(err);
            }
        };
        debug!(operation = %applied.forward.describe(), "operation applied");
        self.history.record(applied.forward, applied.inverse);
        self.commit(&applied.event);
        Ok(())
    }

    /// Revert the most recent step.
    pub fn undo(&mut self) -> Result<(), OpError> {
        let entry = self.history.pop_undo().ok_or(OpError::EmptyHistory)?;
        match operation::apply(&mut self.document, &entry.inverse) {
            Ok(applied) => {
                let redo = self.history.entry(applied.inverse, applied.forward);
                self.history.push_redo(redo);
                self.commit(&applied.event);
                Ok(())
            }
            Err(err) => {
                error!(operation = %entry.label(), error = %err, "undo failed -- history no longer matches the document");
                self.history.push_undo(entry);
                Err(err)
            }
        }
    }

    /// Re-apply the most recently undone step.
    pub fn redo(&mut self) -> Result<(), OpError> {
        let entry = self.history.pop_redo().ok_or(OpError::EmptyHistory)?;
        match operation::apply(&mut self.document, &entry.forward) {
            Ok(applied) => {
                let undo = self.history.entry(applied.forward, applied.inverse);
                self.history.push_undo(undo);
                self.commit(&applied.event);
                Ok(())
            }
            Err(err) => {
                error!(operation = %entry.label(), error = %err, "redo failed -- history no longer matches the document");
                self.history.push_redo(entry);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Apply `op` to a detached copy of the document and return the copy.
    ///
    /// The live document, its history and its listeners are untouched. Used
    /// for transient edits such as an in-progress drag.
    pub fn preview(&self, op: &Operation) -> Result<Document, OpError> {
        let mut scratch = self.document.detached_clone();
        operation::apply(&mut scratch, op)?;
        scratch.set_dirty(true);
        Ok(scratch)
    }

    /// Clear the dirty flag, typically after a successful save.
    pub fn mark_clean(&mut self) {
        self.document.set_dirty(false);
    }

    pub fn is_dirty(&self) -> bool {
        self.document.is_dirty()
    }

    /// Swap in freshly resolved asset descriptors. Not an edit: history and
    /// the dirty flag are untouched.
    pub fn replace_assets(&mut self, assets: AssetTable) {
        self.document.replace_assets(assets);
    }

    pub fn on_change(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> ListenerId {
        self.document.on_change(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.document.remove_listener(id)
    }

    fn commit(&mut self, event: &ChangeEvent) {
        self.document.set_dirty(true);
        self.document.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

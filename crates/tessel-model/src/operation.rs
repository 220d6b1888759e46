//! Reversible scene operations.
//!
//! An [`Operation`] is a plain value describing one edit. Applying it to a
//! [`Document`] yields an [`Applied`] record holding the *resolved* forward
//! operation (ids assigned, indices clamped) and its exact inverse. The
//! history keeps both, so undo and redo replay precisely what happened.
//!
//! Payloads are [`serde_json::Value`]: subtrees use the inline node encoding
//! from [`codec`](crate::codec) and property values are typed per path (see
//! [`property`](crate::property)).
//!
//! Every application is atomic. A failing operation leaves the document as it
//! was; a failing [`Operation::Composite`] rolls back the sub-operations that
//! already succeeded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::codec::{decode_subtree_inline, encode_subtree_inline};
use crate::document::{ChangeEvent, Document};
use crate::entity::EntityId;
use crate::property::{set_property, set_setting};
use crate::ModelError;

/// Index value meaning "append after the last child".
pub const APPEND: i64 = -1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an operation, undo or redo was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    #[error("entity {id} does not exist")]
    NotFound { id: EntityId },

    #[error("entity {id} is not a group")]
    NotAGroup { id: EntityId },

    #[error("the world root cannot be removed or moved")]
    RootImmutable,

    #[error("cannot move {id} under {parent}: it would become its own ancestor")]
    Cycle { id: EntityId, parent: EntityId },

    #[error("property '{path}' does not exist on entity {id}")]
    InvalidPath { id: EntityId, path: String },

    #[error("unknown scene setting '{path}'")]
    InvalidSetting { path: String },

    #[error("property '{path}' expects {expected}, found {found}")]
    InvalidValue {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown object type {}", .found.as_deref().unwrap_or("(missing)"))]
    UnknownType { found: Option<String> },

    #[error("malformed subtree: {details}")]
    Malformed { details: String },

    /// Nothing to undo or redo.
    #[error("history is empty")]
    EmptyHistory,

    /// Sub-operation `index` of a composite failed; the composite was rolled back.
    #[error("composite step {index} failed: {source}")]
    Composite {
        index: usize,
        #[source]
        source: Box<OpError>,
    },
}

impl OpError {
    /// The innermost error, looking through nested composites.
    pub fn root_cause(&self) -> &OpError {
        match self {
            OpError::Composite { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<ModelError> for OpError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound { id } => OpError::NotFound { id },
            ModelError::NotAGroup { id } => OpError::NotAGroup { id },
            ModelError::RootImmutable => OpError::RootImmutable,
            ModelError::Cycle { id, parent } => OpError::Cycle { id, parent },
            ModelError::InvalidPath { id, path } => OpError::InvalidPath { id, path },
            ModelError::InvalidSetting { path } => OpError::InvalidSetting { path },
            ModelError::InvalidValue {
                path,
                expected,
                found,
            } => OpError::InvalidValue {
                path,
                expected,
                found,
            },
            ModelError::UnknownType { found } => OpError::UnknownType { found },
            ModelError::Malformed { details } => OpError::Malformed { details },
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One reversible edit of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Insert `subtree` under `parent` at `index` and place its root at
    /// (`x`, `y`). `index` is clamped; [`APPEND`] appends. Missing or
    /// colliding ids inside the subtree are replaced with fresh ones.
    AddNode {
        subtree: Value,
        parent: EntityId,
        index: i64,
        x: f64,
        y: f64,
    },
    /// Remove a node and its descendants.
    DeleteNode { id: EntityId },
    /// Reparent and/or reorder a node. `index` is clamped after removal.
    MoveNode {
        id: EntityId,
        parent: EntityId,
        index: i64,
    },
    /// Set one entity property.
    ChangeProperty {
        id: EntityId,
        path: String,
        value: Value,
    },
    /// Set one scene setting.
    ChangeSettings { path: String, value: Value },
    /// Apply all of these in order, atomically. Undone as a single step.
    Composite(Vec<Operation>),
}

impl Operation {
    /// Append `subtree` under `parent` at (`x`, `y`).
    pub fn add_node(subtree: Value, parent: &EntityId, x: f64, y: f64) -> Self {
        Operation::AddNode {
            subtree,
            parent: parent.clone(),
            index: APPEND,
            x,
            y,
        }
    }

    pub fn delete(id: &EntityId) -> Self {
        Operation::DeleteNode { id: id.clone() }
    }

    pub fn move_to(id: &EntityId, parent: &EntityId, index: i64) -> Self {
        Operation::MoveNode {
            id: id.clone(),
            parent: parent.clone(),
            index,
        }
    }

    pub fn change(id: &EntityId, path: impl Into<String>, value: Value) -> Self {
        Operation::ChangeProperty {
            id: id.clone(),
            path: path.into(),
            value,
        }
    }

    pub fn change_settings(path: impl Into<String>, value: Value) -> Self {
        Operation::ChangeSettings {
            path: path.into(),
            value,
        }
    }

    pub fn composite(operations: impl IntoIterator<Item = Operation>) -> Self {
        Operation::Composite(operations.into_iter().collect())
    }

    /// Short human-readable label, e.g. for an "Undo ..." menu entry.
    pub fn describe(&self) -> String {
        match self {
            Operation::AddNode { subtree, .. } => {
                let kind = subtree.get("type").and_then(Value::as_str).unwrap_or("node");
                format!("Add {kind}")
            }
            Operation::DeleteNode { id } => format!("Delete {id}"),
            Operation::MoveNode { id, .. } => format!("Move {id}"),
            Operation::ChangeProperty { id, path, .. } => format!("Change {path} of {id}"),
            Operation::ChangeSettings { path, .. } => format!("Change setting {path}"),
            Operation::Composite(ops) => match ops.as_slice() {
                [single] => single.describe(),
                _ => format!("{} changes", ops.len()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Result of applying one operation.
#[derive(Debug, Clone)]
pub(crate) struct Applied {
    /// The operation as it actually took effect. Re-applying it to the state
    /// produced by `inverse` reproduces the same result, ids included.
    pub forward: Operation,
    pub inverse: Operation,
    pub event: ChangeEvent,
}

/// Resolve a signed child index against a list of `len` children.
fn clamp_index(index: i64, len: usize) -> usize {
    if index == APPEND {
        len
    } else {
        usize::try_from(index).map_or(0, |i| i.min(len))
    }
}

/// Apply `op` to `doc` without recording history or emitting events.
pub(crate) fn apply(doc: &mut Document, op: &Operation) -> Result<Applied, OpError> {
    match op {
        Operation::AddNode {
            subtree,
            parent,
            index,
            x,
            y,
        } => {
            for (path, value) in [("x", x), ("y", y)] {
                if !value.is_finite() {
                    return Err(OpError::InvalidValue {
                        path: path.to_owned(),
                        expected: "finite number",
                        found: "non-finite number",
                    });
                }
            }
            let mut tree = decode_subtree_inline(subtree)?;
            tree.entity.transform.x = *x;
            tree.entity.transform.y = *y;
            // A parent that is not a group does not resolve as an insertion target.
            let siblings = doc
                .children(parent)
                .map_err(|_| OpError::NotFound { id: parent.clone() })?
                .len();
            let position = clamp_index(*index, siblings);
            let id = doc.insert_tree(parent, position, tree)?;
            let resolved = encode_subtree_inline(doc, &id)?;
            Ok(Applied {
                forward: Operation::AddNode {
                    subtree: resolved,
                    parent: parent.clone(),
                    index: position as i64,
                    x: *x,
                    y: *y,
                },
                inverse: Operation::DeleteNode { id },
                event: ChangeEvent::StructureChanged,
            })
        }

        Operation::DeleteNode { id } => {
            if id == doc.root_id() {
                return Err(OpError::RootImmutable);
            }
            let subtree = encode_subtree_inline(doc, id)?;
            let detached = doc.remove_subtree(id)?;
            let transform = &detached.tree.entity.transform;
            Ok(Applied {
                inverse: Operation::AddNode {
                    subtree,
                    parent: detached.parent.clone(),
                    index: detached.index as i64,
                    x: transform.x,
                    y: transform.y,
                },
                forward: Operation::DeleteNode { id: id.clone() },
                event: ChangeEvent::StructureChanged,
            })
        }

        Operation::MoveNode { id, parent, index } => {
            // Clamp against the target list as it will be after removal.
            let mut len = doc.children(parent)?.len();
            if doc.get(id)?.parent.as_ref() == Some(parent) {
                len = len.saturating_sub(1);
            }
            let (old_parent, old_index, new_index) =
                doc.move_node(id, parent, clamp_index(*index, len))?;
            Ok(Applied {
                forward: Operation::MoveNode {
                    id: id.clone(),
                    parent: parent.clone(),
                    index: new_index as i64,
                },
                inverse: Operation::MoveNode {
                    id: id.clone(),
                    parent: old_parent,
                    index: old_index as i64,
                },
                event: ChangeEvent::StructureChanged,
            })
        }

        Operation::ChangeProperty { id, path, value } => {
            let previous = set_property(doc.entity_mut(id)?, path, value)?;
            let current = doc.property(id, path)?;
            Ok(Applied {
                forward: Operation::ChangeProperty {
                    id: id.clone(),
                    path: path.clone(),
                    value: current,
                },
                inverse: Operation::ChangeProperty {
                    id: id.clone(),
                    path: path.clone(),
                    value: previous,
                },
                event: ChangeEvent::PropertyChanged {
                    id: id.clone(),
                    path: path.clone(),
                },
            })
        }

        Operation::ChangeSettings { path, value } => {
            let previous = set_setting(doc.settings_mut(), path, value)?;
            Ok(Applied {
                forward: Operation::ChangeSettings {
                    path: path.clone(),
                    value: crate::property::get_setting(doc.settings(), path)?,
                },
                inverse: Operation::ChangeSettings {
                    path: path.clone(),
                    value: previous,
                },
                event: ChangeEvent::SettingsChanged { path: path.clone() },
            })
        }

        Operation::Composite(ops) => {
            let mut forwards = Vec::with_capacity(ops.len());
            let mut inverses = Vec::with_capacity(ops.len());
            for (index, op) in ops.iter().enumerate() {
                match apply(doc, op) {
                    Ok(applied) => {
                        forwards.push(applied.forward);
                        inverses.push(applied.inverse);
                    }
                    Err(source) => {
                        rollback(doc, inverses);
                        return Err(OpError::Composite {
                            index,
                            source: Box::new(source),
                        });
                    }
                }
            }
            inverses.reverse();
            Ok(Applied {
                forward: Operation::Composite(forwards),
                inverse: Operation::Composite(inverses),
                event: ChangeEvent::StructureChanged,
            })
        }
    }
}

/// Undo already-applied composite steps, newest first.
fn rollback(doc: &mut Document, inverses: Vec<Operation>) {
    for inverse in inverses.into_iter().rev() {
        if let Err(err) = apply(doc, &inverse) {
            error!(
                operation = %inverse.describe(),
                error = %err,
                "composite rollback step failed"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamp_index_rules() {
        assert_eq!(clamp_index(APPEND, 3), 3);
        assert_eq!(clamp_index(-7, 3), 0);
        assert_eq!(clamp_index(1, 3), 1);
        assert_eq!(clamp_index(99, 3), 3);
    }

    #[test]
    fn add_node_resolves_ids_and_index() {
        let mut doc = Document::new();
        let root = doc.root_id().clone();
        let op = Operation::AddNode {
            subtree: json!({"type": "sprite"}),
            parent: root.clone(),
            index: 50,
            x: 1.0,
            y: 2.0,
        };
        let applied = apply(&mut doc, &op).unwrap();
        let Operation::AddNode { subtree, index, .. } = &applied.forward else {
            panic!("unexpected forward {:?}", applied.forward);
        };
        assert_eq!(*index, 0);
        let id = subtree["id"].as_str().unwrap();
        assert_eq!(id.len(), 16);
        assert_eq!(applied.inverse, Operation::delete(&EntityId::new(id)));
    }

    #[test]
    fn delete_root_is_refused() {
        let mut doc = Document::new();
        let root = doc.root_id().clone();
        assert_eq!(
            apply(&mut doc, &Operation::delete(&root)).unwrap_err(),
            OpError::RootImmutable
        );
    }

    #[test]
    fn unknown_subtree_type_is_rejected() {
        let mut doc = Document::new();
        let root = doc.root_id().clone();
        let err = apply(&mut doc, &Operation::add_node(json!({"type": "spline"}), &root, 0.0, 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            OpError::UnknownType {
                found: Some("spline".to_owned())
            }
        );
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn change_property_inverse_holds_previous_value() {
        let mut doc = Document::new();
        let root = doc.root_id().clone();
        let applied = apply(&mut doc, &Operation::change(&root, "alpha", json!(0.5))).unwrap();
        assert_eq!(applied.inverse, Operation::change(&root, "alpha", json!(1.0)));
        assert_eq!(
            applied.event,
            ChangeEvent::PropertyChanged {
                id: root,
                path: "alpha".to_owned()
            }
        );
    }

    #[test]
    fn operations_serialize_with_camel_case_tags() {
        let op = Operation::change_settings("width", json!(1024));
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value, json!({"changeSettings": {"path": "width", "value": 1024}}));
        let back: Operation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn add_under_a_leaf_is_not_found() {
        let mut doc = Document::new();
        let root = doc.root_id().clone();
        apply(&mut doc, &Operation::add_node(json!({"type": "sprite"}), &root, 0.0, 0.0)).unwrap();
        let leaf = doc.children(&root).unwrap()[0].clone();
        let err = apply(&mut doc, &Operation::add_node(json!({"type": "sprite"}), &leaf, 0.0, 0.0))
            .err()
            .unwrap();
        assert_eq!(err, OpError::NotFound { id: leaf });
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn describe_labels() {
        let id = EntityId::new("a");
        assert_eq!(Operation::change(&id, "x", json!(1)).describe(), "Change x of a");
        assert_eq!(
            Operation::add_node(json!({"type": "button"}), &id, 0.0, 0.0).describe(),
            "Add button"
        );
        assert_eq!(
            Operation::composite([Operation::delete(&id), Operation::delete(&id)]).describe(),
            "2 changes"
        );
    }
}

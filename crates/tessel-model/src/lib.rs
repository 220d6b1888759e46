//! Tessel model -- the scene document and its operation engine.
//!
//! A scene is a tree of [`Entity`](object::Entity) nodes rooted at a single
//! world group, plus [`SceneSettings`](settings::SceneSettings). The tree is
//! owned by a [`Document`](document::Document) and can only be changed by
//! applying [`Operation`](operation::Operation)s through an
//! [`OperationEngine`](engine::OperationEngine), which records their inverses
//! for undo and redo.
//!
//! # Quick Start
//!
//! ```
//! use tessel_model::prelude::*;
//! use serde_json::json;
//!
//! let mut engine = OperationEngine::new(Document::new());
//! let world = engine.document().root_id().clone();
//!
//! engine
//!     .apply(Operation::add_node(json!({"type": "sprite", "editor": {"name": "hero"}}), &world, 10.0, 20.0))
//!     .unwrap();
//! let hero = engine.document().children(&world).unwrap()[0].clone();
//!
//! engine.apply(Operation::change(&hero, "x", json!(99))).unwrap();
//! assert_eq!(engine.document().get(&hero).unwrap().transform.x, 99.0);
//!
//! engine.undo().unwrap();
//! assert_eq!(engine.document().get(&hero).unwrap().transform.x, 10.0);
//! ```

#![deny(unsafe_code)]

pub mod asset;
pub mod body;
pub mod codec;
pub mod document;
pub mod engine;
pub mod entity;
pub mod history;
pub mod object;
pub mod operation;
pub mod property;
pub mod settings;
pub mod snapshot;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by document queries, property access and subtree decoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// No entity with this id exists in the document.
    #[error("entity {id} does not exist")]
    NotFound { id: entity::EntityId },

    /// A group was required but the entity is a leaf.
    #[error("entity {id} is not a group")]
    NotAGroup { id: entity::EntityId },

    /// The world root cannot be deleted or moved.
    #[error("the world root cannot be removed or moved")]
    RootImmutable,

    /// Moving `id` under `parent` would make it its own ancestor.
    #[error("cannot move {id} under {parent}: it would become its own ancestor")]
    Cycle {
        id: entity::EntityId,
        parent: entity::EntityId,
    },

    /// The property path does not resolve on this entity.
    #[error("property '{path}' does not exist on entity {id}")]
    InvalidPath { id: entity::EntityId, path: String },

    /// The settings path is unknown.
    #[error("unknown scene setting '{path}'")]
    InvalidSetting { path: String },

    /// The value has the wrong JSON type for the property.
    #[error("property '{path}' expects {expected}, found {found}")]
    InvalidValue {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A node discriminant is missing or not one of the known object types.
    #[error("unknown object type {}", type_label(.found))]
    UnknownType { found: Option<String> },

    /// A node is structurally invalid.
    #[error("malformed node: {details}")]
    Malformed { details: String },
}

fn type_label(found: &Option<String>) -> String {
    match found {
        Some(t) => format!("'{t}'"),
        None => "(missing)".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::asset::{AssetDescriptor, AssetKey, AssetRef, AssetResolver, AssetTable};
    pub use crate::body::{BodyShape, BodySize, PhysicsBody};
    pub use crate::codec::NodeTree;
    pub use crate::document::{ChangeEvent, Document, ListenerId};
    pub use crate::engine::{EngineConfig, OperationEngine};
    pub use crate::entity::EntityId;
    pub use crate::history::{History, HistoryEntry};
    pub use crate::object::{
        ButtonData, ButtonFrames, EditorInfo, Entity, GroupData, ObjectKind, Render, SpriteData,
        TileSpriteData, Transform,
    };
    pub use crate::operation::{OpError, Operation};
    pub use crate::settings::{OutputLanguage, SceneSettings};
    pub use crate::snapshot::DocumentSnapshot;
    pub use crate::ModelError;
}

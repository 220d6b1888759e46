//! Scene-graph nodes.
//!
//! Every node is an [`Entity`]: the common editor, transform and render state
//! plus an [`ObjectKind`] payload. `ObjectKind` is a closed sum type, so the
//! serializer and the code generator match on it exhaustively and a new
//! variant is a compile error everywhere it needs handling.

use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::body::PhysicsBody;
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Common sub-models
// ---------------------------------------------------------------------------

/// Editor-only metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorInfo {
    /// Display name shown in the outline. Also the base of generated
    /// variable names.
    pub name: String,
    /// Selectable on the canvas.
    pub pick: bool,
    /// Emitted by the code generator.
    pub generate: bool,
    /// Stored in a field of the generated class.
    pub field: bool,
    /// Field is public. Implies a field even while `field` is false; the two
    /// flags are stored independently, so clearing `public` only drops the
    /// field if `field` was never set.
    pub public: bool,
    /// Visible in the editor.
    pub show: bool,
}

impl Default for EditorInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            pick: true,
            generate: true,
            field: false,
            public: false,
            show: true,
        }
    }
}

impl EditorInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the generator stores this object in a class field.
    pub fn is_field(&self) -> bool {
        self.field || self.public
    }
}

/// Geometry relative to the parent group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees.
    pub angle: f64,
    pub pivot_x: f64,
    pub pivot_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
        }
    }
}

/// Render state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Render {
    pub alpha: f64,
    pub visible: bool,
    pub fixed_to_camera: bool,
}

impl Default for Render {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            visible: true,
            fixed_to_camera: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Ordered children of a group. Order is paint order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupData {
    pub children: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpriteData {
    pub texture: Option<AssetRef>,
    pub body: Option<PhysicsBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileSpriteData {
    pub texture: Option<AssetRef>,
    pub body: Option<PhysicsBody>,
    pub width: f64,
    pub height: f64,
    pub tile_position_x: f64,
    pub tile_position_y: f64,
    pub tile_scale_x: f64,
    pub tile_scale_y: f64,
}

impl Default for TileSpriteData {
    fn default() -> Self {
        Self {
            texture: None,
            body: None,
            width: 64.0,
            height: 64.0,
            tile_position_x: 0.0,
            tile_position_y: 0.0,
            tile_scale_x: 1.0,
            tile_scale_y: 1.0,
        }
    }
}

/// Frame keys a button switches between.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonFrames {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ButtonData {
    pub texture: Option<AssetRef>,
    pub body: Option<PhysicsBody>,
    pub frames: ButtonFrames,
    /// Name of the scene method called on click.
    pub callback: Option<String>,
}

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// What kind of node an entity is.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Group(GroupData),
    Sprite(SpriteData),
    TileSprite(TileSpriteData),
    Button(ButtonData),
}

impl ObjectKind {
    /// The discriminant written to scene files.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Group(_) => "group",
            ObjectKind::Sprite(_) => "sprite",
            ObjectKind::TileSprite(_) => "tile-sprite",
            ObjectKind::Button(_) => "button",
        }
    }

    /// All discriminants understood by the decoder.
    pub const TYPE_NAMES: [&'static str; 4] = ["group", "sprite", "tile-sprite", "button"];

    pub fn is_group(&self) -> bool {
        matches!(self, ObjectKind::Group(_))
    }

    /// Children of a group; `None` for leaves.
    pub fn children(&self) -> Option<&[EntityId]> {
        match self {
            ObjectKind::Group(g) => Some(&g.children),
            ObjectKind::Sprite(_) | ObjectKind::TileSprite(_) | ObjectKind::Button(_) => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<EntityId>> {
        match self {
            ObjectKind::Group(g) => Some(&mut g.children),
            ObjectKind::Sprite(_) | ObjectKind::TileSprite(_) | ObjectKind::Button(_) => None,
        }
    }

    pub fn texture(&self) -> Option<&AssetRef> {
        match self {
            ObjectKind::Group(_) => None,
            ObjectKind::Sprite(d) => d.texture.as_ref(),
            ObjectKind::TileSprite(d) => d.texture.as_ref(),
            ObjectKind::Button(d) => d.texture.as_ref(),
        }
    }

    pub(crate) fn texture_slot(&mut self) -> Option<&mut Option<AssetRef>> {
        match self {
            ObjectKind::Group(_) => None,
            ObjectKind::Sprite(d) => Some(&mut d.texture),
            ObjectKind::TileSprite(d) => Some(&mut d.texture),
            ObjectKind::Button(d) => Some(&mut d.texture),
        }
    }

    pub fn body(&self) -> Option<&PhysicsBody> {
        match self {
            ObjectKind::Group(_) => None,
            ObjectKind::Sprite(d) => d.body.as_ref(),
            ObjectKind::TileSprite(d) => d.body.as_ref(),
            ObjectKind::Button(d) => d.body.as_ref(),
        }
    }

    pub(crate) fn body_slot(&mut self) -> Option<&mut Option<PhysicsBody>> {
        match self {
            ObjectKind::Group(_) => None,
            ObjectKind::Sprite(d) => Some(&mut d.body),
            ObjectKind::TileSprite(d) => Some(&mut d.body),
            ObjectKind::Button(d) => Some(&mut d.body),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A node of the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Back-link to the owning group. `None` only for the world root.
    pub parent: Option<EntityId>,
    pub editor: EditorInfo,
    pub transform: Transform,
    pub render: Render,
    pub kind: ObjectKind,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id,
            parent: None,
            editor: EditorInfo::named(name),
            transform: Transform::default(),
            render: Render::default(),
            kind,
        }
    }

    pub fn group(id: EntityId, name: impl Into<String>) -> Self {
        Self::new(id, name, ObjectKind::Group(GroupData::default()))
    }

    pub fn sprite(id: EntityId, name: impl Into<String>, texture: Option<AssetRef>) -> Self {
        Self::new(
            id,
            name,
            ObjectKind::Sprite(SpriteData {
                texture,
                body: None,
            }),
        )
    }

    pub fn is_group(&self) -> bool {
        self.kind.is_group()
    }

    /// Outline label, e.g. `hero[sprite]`.
    pub fn label(&self) -> String {
        format!("{}[{}]", self.editor.name, self.kind.type_name())
    }
}

//! JSON encoding of entity subtrees.
//!
//! The same node format is used by `AddNode` operation payloads and by scene
//! files. The only difference is how textures are written: operations inline
//! the [`AssetRef`], scene files point into an asset table. Callers choose by
//! passing the texture hook.
//!
//! ```text
//! { "type": "sprite", "id": "…",
//!   "editor": {…}, "transform": {…}, "render": {…},
//!   "texture": <hook output>, "body": {…} }
//! ```
//!
//! Groups add `"children": [...]`, tile sprites a `"tile"` object and buttons
//! `"frames"` plus `"callback"`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::asset::AssetRef;
use crate::body::PhysicsBody;
use crate::document::Document;
use crate::entity::EntityId;
use crate::object::{
    ButtonData, ButtonFrames, EditorInfo, Entity, GroupData, ObjectKind, Render, SpriteData,
    TileSpriteData, Transform,
};
use crate::ModelError;

// ---------------------------------------------------------------------------
// NodeTree
// ---------------------------------------------------------------------------

/// An owned, detached subtree.
///
/// The entity's `parent` is ignored and group `children` lists are rebuilt
/// from `children` when the tree is inserted into a document. An empty id
/// means "assign one on insertion".
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    pub entity: Entity,
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    pub fn leaf(entity: Entity) -> Self {
        Self {
            entity,
            children: Vec::new(),
        }
    }

    /// Number of entities in the subtree, root included.
    pub fn entity_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(NodeTree::entity_count)
            .sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode the subtree rooted at `id`. Textures are written through `texture`.
pub fn encode_subtree(
    doc: &Document,
    id: &EntityId,
    texture: &mut dyn FnMut(&AssetRef) -> Value,
) -> Result<Value, ModelError> {
    let entity = doc.get(id)?;
    let mut obj = encode_common(entity);

    match &entity.kind {
        ObjectKind::Group(group) => {
            let children = group
                .children
                .iter()
                .map(|child| encode_subtree(doc, child, texture))
                .collect::<Result<Vec<_>, _>>()?;
            obj.insert("children".to_owned(), Value::Array(children));
        }
        ObjectKind::Sprite(d) => {
            encode_leaf(&mut obj, d.texture.as_ref(), d.body.as_ref(), texture);
        }
        ObjectKind::TileSprite(d) => {
            encode_leaf(&mut obj, d.texture.as_ref(), d.body.as_ref(), texture);
            obj.insert("tile".to_owned(), to_value(&TileFields::from(d)));
        }
        ObjectKind::Button(d) => {
            encode_leaf(&mut obj, d.texture.as_ref(), d.body.as_ref(), texture);
            obj.insert("frames".to_owned(), to_value(&d.frames));
            if let Some(callback) = &d.callback {
                obj.insert("callback".to_owned(), Value::String(callback.clone()));
            }
        }
    }

    Ok(Value::Object(obj))
}

/// Encode with inline texture references, as used in operation payloads.
pub fn encode_subtree_inline(doc: &Document, id: &EntityId) -> Result<Value, ModelError> {
    encode_subtree(doc, id, &mut inline_texture)
}

/// Texture hook writing the full [`AssetRef`] object.
pub fn inline_texture(asset: &AssetRef) -> Value {
    to_value(asset)
}

fn encode_common(entity: &Entity) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(
        "type".to_owned(),
        Value::String(entity.kind.type_name().to_owned()),
    );
    obj.insert("id".to_owned(), Value::String(entity.id.to_string()));
    obj.insert("editor".to_owned(), to_value(&entity.editor));
    obj.insert("transform".to_owned(), to_value(&entity.transform));
    obj.insert("render".to_owned(), to_value(&entity.render));
    obj
}

fn encode_leaf(
    obj: &mut Map<String, Value>,
    asset: Option<&AssetRef>,
    body: Option<&PhysicsBody>,
    texture: &mut dyn FnMut(&AssetRef) -> Value,
) {
    if let Some(asset) = asset {
        obj.insert("texture".to_owned(), texture(asset));
    }
    if let Some(body) = body {
        obj.insert("body".to_owned(), to_value(body));
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    // Model types only contain strings, numbers, bools and options, which
    // serde_json always accepts.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a subtree. Textures are read through `texture`, which may return
/// `Ok(None)` to drop a reference it cannot honour.
pub fn decode_subtree(
    value: &Value,
    texture: &mut dyn FnMut(&Value) -> Result<Option<AssetRef>, ModelError>,
) -> Result<NodeTree, ModelError> {
    let obj = value.as_object().ok_or_else(|| ModelError::Malformed {
        details: format!("expected an object node, found {}", json_kind(value)),
    })?;

    let type_name = match obj.get("type") {
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(ModelError::UnknownType {
                found: Some(other.to_string()),
            })
        }
        None => return Err(ModelError::UnknownType { found: None }),
    };

    let id = match obj.get("id") {
        Some(Value::String(s)) => EntityId::new(s.clone()),
        None | Some(Value::Null) => EntityId::new(""),
        Some(other) => {
            return Err(ModelError::Malformed {
                details: format!("node id must be a string, found {}", json_kind(other)),
            })
        }
    };

    let editor: EditorInfo = field(obj, "editor")?;
    let transform: Transform = field(obj, "transform")?;
    let render: Render = field(obj, "render")?;

    let mut children = Vec::new();
    let kind = match type_name {
        "group" => {
            if let Some(list) = obj.get("children") {
                let list = list.as_array().ok_or_else(|| ModelError::Malformed {
                    details: format!("group children must be an array, found {}", json_kind(list)),
                })?;
                for child in list {
                    children.push(decode_subtree(child, texture)?);
                }
            }
            ObjectKind::Group(GroupData::default())
        }
        "sprite" => {
            let (texture, body) = decode_leaf(obj, texture)?;
            ObjectKind::Sprite(SpriteData { texture, body })
        }
        "tile-sprite" => {
            let (texture, body) = decode_leaf(obj, texture)?;
            let tile: TileFields = field(obj, "tile")?;
            ObjectKind::TileSprite(tile.into_data(texture, body))
        }
        "button" => {
            let (texture, body) = decode_leaf(obj, texture)?;
            let frames: ButtonFrames = field(obj, "frames")?;
            let callback: Option<String> = field(obj, "callback")?;
            ObjectKind::Button(ButtonData {
                texture,
                body,
                frames,
                callback,
            })
        }
        other => {
            return Err(ModelError::UnknownType {
                found: Some(other.to_owned()),
            })
        }
    };

    Ok(NodeTree {
        entity: Entity {
            id,
            parent: None,
            editor,
            transform,
            render,
            kind,
        },
        children,
    })
}

/// Decode a subtree whose textures are inline [`AssetRef`] objects.
pub fn decode_subtree_inline(value: &Value) -> Result<NodeTree, ModelError> {
    decode_subtree(value, &mut decode_inline_texture)
}

/// Texture hook reading a full [`AssetRef`] object.
pub fn decode_inline_texture(value: &Value) -> Result<Option<AssetRef>, ModelError> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value.clone())
        .map(Some)
        .map_err(|e| ModelError::Malformed {
            details: format!("invalid texture reference: {e}"),
        })
}

fn decode_leaf(
    obj: &Map<String, Value>,
    texture: &mut dyn FnMut(&Value) -> Result<Option<AssetRef>, ModelError>,
) -> Result<(Option<AssetRef>, Option<PhysicsBody>), ModelError> {
    let asset = match obj.get("texture") {
        Some(v) => texture(v)?,
        None => None,
    };
    let body: Option<PhysicsBody> = field(obj, "body")?;
    Ok((asset, body))
}

/// Read an optional field, falling back to `T::default()` when absent or null.
fn field<T: DeserializeOwned + Default>(
    obj: &Map<String, Value>,
    key: &str,
) -> Result<T, ModelError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| ModelError::Malformed {
            details: format!("invalid '{key}': {e}"),
        }),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tile sprite fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TileFields {
    width: f64,
    height: f64,
    position_x: f64,
    position_y: f64,
    scale_x: f64,
    scale_y: f64,
}

impl Default for TileFields {
    fn default() -> Self {
        TileFields::from(&TileSpriteData::default())
    }
}

impl From<&TileSpriteData> for TileFields {
    fn from(d: &TileSpriteData) -> Self {
        Self {
            width: d.width,
            height: d.height,
            position_x: d.tile_position_x,
            position_y: d.tile_position_y,
            scale_x: d.tile_scale_x,
            scale_y: d.tile_scale_y,
        }
    }
}

impl TileFields {
    fn into_data(self, texture: Option<AssetRef>, body: Option<PhysicsBody>) -> TileSpriteData {
        TileSpriteData {
            texture,
            body,
            width: self.width,
            height: self.height,
            tile_position_x: self.position_x,
            tile_position_y: self.position_y,
            tile_scale_x: self.scale_x,
            tile_scale_y: self.scale_y,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

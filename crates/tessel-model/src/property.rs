//! Dotted-path property access.
//!
//! `ChangeProperty` and `ChangeSettings` address a single field by a path
//! such as `"scale.x"` or `"body.radius"`. Values travel as
//! [`serde_json::Value`]. Setting a property returns the value it replaced,
//! which is exactly what an inverse operation needs.
//!
//! A path is valid for an entity only if the field exists on that entity:
//! `"texture"` on a group, `"body.radius"` on a rectangular body or any
//! `"body.*"` path while no body is attached is [`ModelError::InvalidPath`].
//!
//! | path                                   | applies to          | value            |
//! |----------------------------------------|---------------------|------------------|
//! | `name`                                 | all                 | string           |
//! | `editor.pick` / `generate` / `field` / `public` / `show` | all | bool       |
//! | `x` `y` `angle` `scale.x` `scale.y` `pivot.x` `pivot.y` `alpha` | all | number |
//! | `visible` `fixedToCamera`              | all                 | bool             |
//! | `texture`                              | leaves              | asset ref / null |
//! | `texture.frame`                        | leaves with texture | string / null    |
//! | `body`                                 | leaves              | body / null      |
//! | `body.offset.x` `body.offset.y` `body.mass` | leaves with body | number        |
//! | `body.width` `body.height`             | rect bodies         | number / "auto"  |
//! | `body.radius`                          | circle bodies       | number / "auto"  |
//! | `body.moves` `immovable` `collideWorldBounds` `allowRotation` `allowGravity` | leaves with body | bool |
//! | `width` `height` `tilePosition.x/y` `tileScale.x/y` | tile sprites | number  |
//! | `frames.over/out/down/up` `callback`   | buttons             | string / null    |
//!
//! `editor.field` and `editor.public` are stored independently. Either one
//! makes the object a generated field; see
//! [`EditorInfo::is_field`](crate::object::EditorInfo::is_field).

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::asset::AssetRef;
use crate::body::{BodyShape, BodySize, PhysicsBody};
use crate::codec::{decode_inline_texture, json_kind};
use crate::object::{ButtonData, Entity, ObjectKind, TileSpriteData};
use crate::settings::{OutputLanguage, SceneSettings};
use crate::ModelError;

// ---------------------------------------------------------------------------
// Entity paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prop {
    Name,
    Pick,
    Generate,
    Field,
    Public,
    Show,
    X,
    Y,
    Angle,
    ScaleX,
    ScaleY,
    PivotX,
    PivotY,
    Alpha,
    Visible,
    FixedToCamera,
    Texture,
    TextureFrame,
    Body,
    BodyOffsetX,
    BodyOffsetY,
    BodyWidth,
    BodyHeight,
    BodyRadius,
    BodyMass,
    BodyMoves,
    BodyImmovable,
    BodyCollideWorldBounds,
    BodyAllowRotation,
    BodyAllowGravity,
    TileWidth,
    TileHeight,
    TilePositionX,
    TilePositionY,
    TileScaleX,
    TileScaleY,
    FrameOver,
    FrameOut,
    FrameDown,
    FrameUp,
    Callback,
}

impl Prop {
    fn parse(path: &str) -> Option<Prop> {
        Some(match path {
            "name" => Prop::Name,
            "editor.pick" => Prop::Pick,
            "editor.generate" => Prop::Generate,
            "editor.field" => Prop::Field,
            "editor.public" => Prop::Public,
            "editor.show" => Prop::Show,
            "x" => Prop::X,
            "y" => Prop::Y,
            "angle" => Prop::Angle,
            "scale.x" => Prop::ScaleX,
            "scale.y" => Prop::ScaleY,
            "pivot.x" => Prop::PivotX,
            "pivot.y" => Prop::PivotY,
            "alpha" => Prop::Alpha,
            "visible" => Prop::Visible,
            "fixedToCamera" => Prop::FixedToCamera,
            "texture" => Prop::Texture,
            "texture.frame" => Prop::TextureFrame,
            "body" => Prop::Body,
            "body.offset.x" => Prop::BodyOffsetX,
            "body.offset.y" => Prop::BodyOffsetY,
            "body.width" => Prop::BodyWidth,
            "body.height" => Prop::BodyHeight,
            "body.radius" => Prop::BodyRadius,
            "body.mass" => Prop::BodyMass,
            "body.moves" => Prop::BodyMoves,
            "body.immovable" => Prop::BodyImmovable,
            "body.collideWorldBounds" => Prop::BodyCollideWorldBounds,
            "body.allowRotation" => Prop::BodyAllowRotation,
            "body.allowGravity" => Prop::BodyAllowGravity,
            "width" => Prop::TileWidth,
            "height" => Prop::TileHeight,
            "tilePosition.x" => Prop::TilePositionX,
            "tilePosition.y" => Prop::TilePositionY,
            "tileScale.x" => Prop::TileScaleX,
            "tileScale.y" => Prop::TileScaleY,
            "frames.over" => Prop::FrameOver,
            "frames.out" => Prop::FrameOut,
            "frames.down" => Prop::FrameDown,
            "frames.up" => Prop::FrameUp,
            "callback" => Prop::Callback,
            _ => return None,
        })
    }
}

/// Read a property. Fails with [`ModelError::InvalidPath`] when the path does
/// not resolve on this entity.
pub fn get_property(entity: &Entity, path: &str) -> Result<Value, ModelError> {
    Prop::parse(path)
        .and_then(|prop| read(entity, prop))
        .ok_or_else(|| ModelError::InvalidPath {
            id: entity.id.clone(),
            path: path.to_owned(),
        })
}

/// Write a property and return the value it replaced.
///
/// The entity is untouched on error.
pub fn set_property(entity: &mut Entity, path: &str, value: &Value) -> Result<Value, ModelError> {
    let id = entity.id.clone();
    let invalid = || ModelError::InvalidPath {
        id: id.clone(),
        path: path.to_owned(),
    };
    let prop = Prop::parse(path).ok_or_else(invalid)?;
    let previous = read(entity, prop).ok_or_else(invalid)?;

    match prop {
        Prop::Name => entity.editor.name = string(path, value)?,
        Prop::Pick => entity.editor.pick = boolean(path, value)?,
        Prop::Generate => entity.editor.generate = boolean(path, value)?,
        Prop::Field => entity.editor.field = boolean(path, value)?,
        Prop::Public => entity.editor.public = boolean(path, value)?,
        Prop::Show => entity.editor.show = boolean(path, value)?,
        Prop::X => entity.transform.x = number(path, value)?,
        Prop::Y => entity.transform.y = number(path, value)?,
        Prop::Angle => entity.transform.angle = number(path, value)?,
        Prop::ScaleX => entity.transform.scale_x = number(path, value)?,
        Prop::ScaleY => entity.transform.scale_y = number(path, value)?,
        Prop::PivotX => entity.transform.pivot_x = number(path, value)?,
        Prop::PivotY => entity.transform.pivot_y = number(path, value)?,
        Prop::Alpha => entity.render.alpha = number(path, value)?,
        Prop::Visible => entity.render.visible = boolean(path, value)?,
        Prop::FixedToCamera => entity.render.fixed_to_camera = boolean(path, value)?,

        Prop::Texture => {
            let texture = texture(path, value)?;
            *entity.kind.texture_slot().ok_or_else(invalid)? = texture;
        }
        Prop::TextureFrame => {
            let frame = optional_string(path, value)?;
            texture_mut(entity).ok_or_else(invalid)?.frame = frame;
        }

        Prop::Body => {
            let body = typed::<Option<PhysicsBody>>(path, value, "a body object or null")?;
            *entity.kind.body_slot().ok_or_else(invalid)? = body;
        }
        Prop::BodyOffsetX => body_mut(entity).ok_or_else(invalid)?.offset_x = number(path, value)?,
        Prop::BodyOffsetY => body_mut(entity).ok_or_else(invalid)?.offset_y = number(path, value)?,
        Prop::BodyMass => body_mut(entity).ok_or_else(invalid)?.mass = number(path, value)?,
        Prop::BodyMoves => body_mut(entity).ok_or_else(invalid)?.moves = boolean(path, value)?,
        Prop::BodyImmovable => {
            body_mut(entity).ok_or_else(invalid)?.immovable = boolean(path, value)?
        }
        Prop::BodyCollideWorldBounds => {
            body_mut(entity).ok_or_else(invalid)?.collide_world_bounds = boolean(path, value)?
        }
        Prop::BodyAllowRotation => {
            body_mut(entity).ok_or_else(invalid)?.allow_rotation = boolean(path, value)?
        }
        Prop::BodyAllowGravity => {
            body_mut(entity).ok_or_else(invalid)?.allow_gravity = boolean(path, value)?
        }
        Prop::BodyWidth | Prop::BodyHeight | Prop::BodyRadius => {
            let size = body_size(path, value)?;
            let body = body_mut(entity).ok_or_else(invalid)?;
            match (prop, &mut body.shape) {
                (Prop::BodyWidth, BodyShape::Rect { width, .. }) => *width = size,
                (Prop::BodyHeight, BodyShape::Rect { height, .. }) => *height = size,
                (Prop::BodyRadius, BodyShape::Circle { radius }) => *radius = size,
                _ => return Err(invalid()),
            }
        }

        Prop::TileWidth => tile_mut(entity).ok_or_else(invalid)?.width = number(path, value)?,
        Prop::TileHeight => tile_mut(entity).ok_or_else(invalid)?.height = number(path, value)?,
        Prop::TilePositionX => {
            tile_mut(entity).ok_or_else(invalid)?.tile_position_x = number(path, value)?
        }
        Prop::TilePositionY => {
            tile_mut(entity).ok_or_else(invalid)?.tile_position_y = number(path, value)?
        }
        Prop::TileScaleX => {
            tile_mut(entity).ok_or_else(invalid)?.tile_scale_x = number(path, value)?
        }
        Prop::TileScaleY => {
            tile_mut(entity).ok_or_else(invalid)?.tile_scale_y = number(path, value)?
        }

        Prop::FrameOver => {
            button_mut(entity).ok_or_else(invalid)?.frames.over = optional_string(path, value)?
        }
        Prop::FrameOut => {
            button_mut(entity).ok_or_else(invalid)?.frames.out = optional_string(path, value)?
        }
        Prop::FrameDown => {
            button_mut(entity).ok_or_else(invalid)?.frames.down = optional_string(path, value)?
        }
        Prop::FrameUp => {
            button_mut(entity).ok_or_else(invalid)?.frames.up = optional_string(path, value)?
        }
        Prop::Callback => {
            button_mut(entity).ok_or_else(invalid)?.callback = optional_string(path, value)?
        }
    }

    Ok(previous)
}

fn read(entity: &Entity, prop: Prop) -> Option<Value> {
    let kind = &entity.kind;
    match prop {
        Prop::Name => Some(json!(entity.editor.name)),
        Prop::Pick => Some(json!(entity.editor.pick)),
        Prop::Generate => Some(json!(entity.editor.generate)),
        Prop::Field => Some(json!(entity.editor.field)),
        Prop::Public => Some(json!(entity.editor.public)),
        Prop::Show => Some(json!(entity.editor.show)),
        Prop::X => Some(json!(entity.transform.x)),
        Prop::Y => Some(json!(entity.transform.y)),
        Prop::Angle => Some(json!(entity.transform.angle)),
        Prop::ScaleX => Some(json!(entity.transform.scale_x)),
        Prop::ScaleY => Some(json!(entity.transform.scale_y)),
        Prop::PivotX => Some(json!(entity.transform.pivot_x)),
        Prop::PivotY => Some(json!(entity.transform.pivot_y)),
        Prop::Alpha => Some(json!(entity.render.alpha)),
        Prop::Visible => Some(json!(entity.render.visible)),
        Prop::FixedToCamera => Some(json!(entity.render.fixed_to_camera)),

        Prop::Texture => (!kind.is_group()).then(|| encode(&kind.texture())),
        Prop::TextureFrame => kind.texture().map(|t| json!(t.frame)),

        Prop::Body => (!kind.is_group()).then(|| encode(&kind.body())),
        Prop::BodyOffsetX => kind.body().map(|b| json!(b.offset_x)),
        Prop::BodyOffsetY => kind.body().map(|b| json!(b.offset_y)),
        Prop::BodyMass => kind.body().map(|b| json!(b.mass)),
        Prop::BodyMoves => kind.body().map(|b| json!(b.moves)),
        Prop::BodyImmovable => kind.body().map(|b| json!(b.immovable)),
        Prop::BodyCollideWorldBounds => kind.body().map(|b| json!(b.collide_world_bounds)),
        Prop::BodyAllowRotation => kind.body().map(|b| json!(b.allow_rotation)),
        Prop::BodyAllowGravity => kind.body().map(|b| json!(b.allow_gravity)),
        Prop::BodyWidth => match kind.body().map(|b| &b.shape) {
            Some(BodyShape::Rect { width, .. }) => Some(encode(width)),
            _ => None,
        },
        Prop::BodyHeight => match kind.body().map(|b| &b.shape) {
            Some(BodyShape::Rect { height, .. }) => Some(encode(height)),
            _ => None,
        },
        Prop::BodyRadius => match kind.body().map(|b| &b.shape) {
            Some(BodyShape::Circle { radius }) => Some(encode(radius)),
            _ => None,
        },

        Prop::TileWidth => tile(kind).map(|t| json!(t.width)),
        Prop::TileHeight => tile(kind).map(|t| json!(t.height)),
        Prop::TilePositionX => tile(kind).map(|t| json!(t.tile_position_x)),
        Prop::TilePositionY => tile(kind).map(|t| json!(t.tile_position_y)),
        Prop::TileScaleX => tile(kind).map(|t| json!(t.tile_scale_x)),
        Prop::TileScaleY => tile(kind).map(|t| json!(t.tile_scale_y)),

        Prop::FrameOver => button(kind).map(|b| json!(b.frames.over)),
        Prop::FrameOut => button(kind).map(|b| json!(b.frames.out)),
        Prop::FrameDown => button(kind).map(|b| json!(b.frames.down)),
        Prop::FrameUp => button(kind).map(|b| json!(b.frames.up)),
        Prop::Callback => button(kind).map(|b| json!(b.callback)),
    }
}

fn tile(kind: &ObjectKind) -> Option<&TileSpriteData> {
    match kind {
        ObjectKind::TileSprite(d) => Some(d),
        _ => None,
    }
}

fn button(kind: &ObjectKind) -> Option<&ButtonData> {
    match kind {
        ObjectKind::Button(d) => Some(d),
        _ => None,
    }
}

fn tile_mut(entity: &mut Entity) -> Option<&mut TileSpriteData> {
    match &mut entity.kind {
        ObjectKind::TileSprite(d) => Some(d),
        _ => None,
    }
}

fn button_mut(entity: &mut Entity) -> Option<&mut ButtonData> {
    match &mut entity.kind {
        ObjectKind::Button(d) => Some(d),
        _ => None,
    }
}

fn texture_mut(entity: &mut Entity) -> Option<&mut AssetRef> {
    entity.kind.texture_slot().and_then(Option::as_mut)
}

fn body_mut(entity: &mut Entity) -> Option<&mut PhysicsBody> {
    entity.kind.body_slot().and_then(Option::as_mut)
}

// ---------------------------------------------------------------------------
// Settings paths
// ---------------------------------------------------------------------------

const SETTING_PATHS: [&str; 10] = [
    "width",
    "height",
    "backgroundColor",
    "snap.enabled",
    "snap.width",
    "snap.height",
    "generateOnSave",
    "outputLanguage",
    "className",
    "superClass",
];

/// Read a scene setting by path.
pub fn get_setting(settings: &SceneSettings, path: &str) -> Result<Value, ModelError> {
    Ok(match path {
        "width" => json!(settings.width),
        "height" => json!(settings.height),
        "backgroundColor" => json!(settings.background_color),
        "snap.enabled" => json!(settings.snap_enabled),
        "snap.width" => json!(settings.snap_width),
        "snap.height" => json!(settings.snap_height),
        "generateOnSave" => json!(settings.generate_on_save),
        "outputLanguage" => encode(&settings.output_language),
        "className" => json!(settings.class_name),
        "superClass" => json!(settings.super_class),
        _ => {
            return Err(ModelError::InvalidSetting {
                path: path.to_owned(),
            })
        }
    })
}

/// Write a scene setting and return the value it replaced.
pub fn set_setting(
    settings: &mut SceneSettings,
    path: &str,
    value: &Value,
) -> Result<Value, ModelError> {
    let previous = get_setting(settings, path)?;
    match path {
        "width" => settings.width = number(path, value)?,
        "height" => settings.height = number(path, value)?,
        "backgroundColor" => settings.background_color = string(path, value)?,
        "snap.enabled" => settings.snap_enabled = boolean(path, value)?,
        "snap.width" => settings.snap_width = number(path, value)?,
        "snap.height" => settings.snap_height = number(path, value)?,
        "generateOnSave" => settings.generate_on_save = boolean(path, value)?,
        "outputLanguage" => {
            settings.output_language =
                typed::<OutputLanguage>(path, value, "\"JavaScript\" or \"TypeScript\"")?
        }
        "className" => settings.class_name = optional_string(path, value)?,
        "superClass" => settings.super_class = string(path, value)?,
        _ => {
            return Err(ModelError::InvalidSetting {
                path: path.to_owned(),
            })
        }
    }
    Ok(previous)
}

/// Paths accepted by [`get_setting`] and [`set_setting`].
pub fn setting_paths() -> impl Iterator<Item = &'static str> {
    SETTING_PATHS.iter().copied()
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn encode<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> ModelError {
    ModelError::InvalidValue {
        path: path.to_owned(),
        expected,
        found: json_kind(found),
    }
}

fn number(path: &str, value: &Value) -> Result<f64, ModelError> {
    value
        .as_f64()
        .ok_or_else(|| mismatch(path, "a number", value))
}

fn boolean(path: &str, value: &Value) -> Result<bool, ModelError> {
    value
        .as_bool()
        .ok_or_else(|| mismatch(path, "a boolean", value))
}

fn string(path: &str, value: &Value) -> Result<String, ModelError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| mismatch(path, "a string", value))
}

fn optional_string(path: &str, value: &Value) -> Result<Option<String>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(mismatch(path, "a string or null", other)),
    }
}

fn body_size(path: &str, value: &Value) -> Result<BodySize, ModelError> {
    typed(path, value, "a number or \"auto\"")
}

fn texture(path: &str, value: &Value) -> Result<Option<AssetRef>, ModelError> {
    decode_inline_texture(value).map_err(|_| mismatch(path, "an asset reference or null", value))
}

fn typed<T: DeserializeOwned>(
    path: &str,
    value: &Value,
    expected: &'static str,
) -> Result<T, ModelError> {
    serde_json::from_value(value.clone()).map_err(|_| mismatch(path, expected, value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::object::{GroupData, TileSpriteData};

    fn sprite() -> Entity {
        Entity::sprite(EntityId::new("s"), "hero", None)
    }

    #[test]
    fn set_returns_previous_value() {
        let mut e = sprite();
        let old = set_property(&mut e, "x", &json!(42)).unwrap();
        assert_eq!(old, json!(0.0));
        assert_eq!(e.transform.x, 42.0);
        assert_eq!(get_property(&e, "x").unwrap(), json!(42.0));
    }

    #[test]
    fn public_and_field_flags_are_independent() {
        let mut e = sprite();
        set_property(&mut e, "editor.field", &json!(true)).unwrap();
        set_property(&mut e, "editor.public", &json!(true)).unwrap();
        set_property(&mut e, "editor.public", &json!(false)).unwrap();
        assert!(e.editor.is_field());

        let mut e = sprite();
        set_property(&mut e, "editor.public", &json!(true)).unwrap();
        assert!(e.editor.is_field());
        assert!(!e.editor.field);
        set_property(&mut e, "editor.public", &json!(false)).unwrap();
        assert!(!e.editor.is_field());
    }

    #[test]
    fn wrong_type_leaves_entity_untouched() {
        let mut e = sprite();
        let before = e.clone();
        let err = set_property(&mut e, "alpha", &json!("opaque")).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidValue { expected: "a number", found: "a string", .. }
        ));
        assert_eq!(e, before);
    }

    #[test]
    fn unknown_and_inapplicable_paths_are_rejected() {
        let mut e = sprite();
        assert!(matches!(
            set_property(&mut e, "colour", &json!(1)),
            Err(ModelError::InvalidPath { .. })
        ));
        assert!(matches!(
            set_property(&mut e, "width", &json!(1)),
            Err(ModelError::InvalidPath { .. })
        ));
        assert!(matches!(
            get_property(&e, "body.mass"),
            Err(ModelError::InvalidPath { .. })
        ));

        let group = Entity::new(EntityId::new("g"), "g", ObjectKind::Group(GroupData::default()));
        assert!(get_property(&group, "texture").is_err());
        assert!(get_property(&group, "x").is_ok());
    }

    #[test]
    fn body_paths_follow_the_shape() {
        let mut e = sprite();
        let old = set_property(&mut e, "body", &json!({"shape": "circle"})).unwrap();
        assert_eq!(old, Value::Null);
        assert_eq!(get_property(&e, "body.radius").unwrap(), json!("auto"));
        set_property(&mut e, "body.radius", &json!(10)).unwrap();
        assert_eq!(get_property(&e, "body.radius").unwrap(), json!(10.0));
        assert!(matches!(
            set_property(&mut e, "body.width", &json!(3)),
            Err(ModelError::InvalidPath { .. })
        ));
        set_property(&mut e, "body.moves", &json!(false)).unwrap();
        assert!(!e.kind.body().unwrap().moves);
    }

    #[test]
    fn texture_and_frame() {
        let mut e = sprite();
        assert!(set_property(&mut e, "texture.frame", &json!("a")).is_err());
        set_property(
            &mut e,
            "texture",
            &json!({"pack": "p.json", "section": "s", "key": "atlas"}),
        )
        .unwrap();
        let old = set_property(&mut e, "texture.frame", &json!("walk0")).unwrap();
        assert_eq!(old, Value::Null);
        assert_eq!(e.kind.texture().unwrap().frame.as_deref(), Some("walk0"));
    }

    #[test]
    fn tile_paths() {
        let mut e = Entity::new(
            EntityId::new("t"),
            "floor",
            ObjectKind::TileSprite(TileSpriteData::default()),
        );
        set_property(&mut e, "tileScale.y", &json!(2.5)).unwrap();
        assert_eq!(get_property(&e, "tileScale.y").unwrap(), json!(2.5));
        assert_eq!(get_property(&e, "width").unwrap(), json!(64.0));
    }

    #[test]
    fn settings_round_trip_through_paths() {
        let mut s = SceneSettings::default();
        let old = set_setting(&mut s, "outputLanguage", &json!("TypeScript")).unwrap();
        assert_eq!(old, json!("JavaScript"));
        assert_eq!(s.output_language, OutputLanguage::TypeScript);
        set_setting(&mut s, "className", &json!("Level1")).unwrap();
        assert_eq!(get_setting(&s, "className").unwrap(), json!("Level1"));
        assert!(matches!(
            set_setting(&mut s, "outputLanguage", &json!("Lua")),
            Err(ModelError::InvalidValue { .. })
        ));
        assert!(matches!(
            get_setting(&s, "snap"),
            Err(ModelError::InvalidSetting { .. })
        ));
        assert_eq!(setting_paths().count(), 10);
    }
}

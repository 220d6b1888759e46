//! Arcade physics body sub-model.
//!
//! Bodies are optional on every leaf object. Sizes may be [`BodySize::Auto`],
//! meaning "use the texture's natural size at render time". The core never
//! resolves `Auto` to a number; it is written to disk as the string `"auto"`.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// BodySize
// ---------------------------------------------------------------------------

/// A body dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BodySize {
    /// Derived from the texture when the object is rendered.
    #[default]
    Auto,
    /// Explicit size in pixels.
    Fixed(f64),
}

impl BodySize {
    /// Concrete size given the texture's natural size.
    pub fn resolve(self, natural: f64) -> f64 {
        match self {
            BodySize::Auto => natural,
            BodySize::Fixed(v) => v,
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, BodySize::Auto)
    }
}

impl Serialize for BodySize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BodySize::Auto => serializer.serialize_str("auto"),
            BodySize::Fixed(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for BodySize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SizeVisitor;

        impl Visitor<'_> for SizeVisitor {
            type Value = BodySize;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or the string \"auto\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BodySize, E> {
                if v == "auto" {
                    Ok(BodySize::Auto)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<BodySize, E> {
                Ok(BodySize::Fixed(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<BodySize, E> {
                Ok(BodySize::Fixed(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BodySize, E> {
                Ok(BodySize::Fixed(v as f64))
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

// ---------------------------------------------------------------------------
// BodyShape / PhysicsBody
// ---------------------------------------------------------------------------

/// Collision shape of a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum BodyShape {
    Rect {
        #[serde(default)]
        width: BodySize,
        #[serde(default)]
        height: BodySize,
    },
    Circle {
        #[serde(default)]
        radius: BodySize,
    },
}

/// Arcade physics body attached to a leaf object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsBody {
    #[serde(flatten)]
    pub shape: BodyShape,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(default = "default_true")]
    pub moves: bool,
    #[serde(default)]
    pub immovable: bool,
    #[serde(default)]
    pub collide_world_bounds: bool,
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    #[serde(default = "default_true")]
    pub allow_gravity: bool,
}

fn default_mass() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl PhysicsBody {
    /// A rectangular body with auto-sized width and height.
    pub fn rect() -> Self {
        Self::with_shape(BodyShape::Rect {
            width: BodySize::Auto,
            height: BodySize::Auto,
        })
    }

    /// A circular body with an auto-sized radius.
    pub fn circle() -> Self {
        Self::with_shape(BodyShape::Circle {
            radius: BodySize::Auto,
        })
    }

    pub fn with_shape(shape: BodyShape) -> Self {
        Self {
            shape,
            offset_x: 0.0,
            offset_y: 0.0,
            mass: default_mass(),
            moves: true,
            immovable: false,
            collide_world_bounds: false,
            allow_rotation: true,
            allow_gravity: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auto_survives_json() {
        let body = PhysicsBody::rect();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["shape"], "rect");
        assert_eq!(value["width"], "auto");
        let back: PhysicsBody = serde_json::from_value(value).unwrap();
        assert_eq!(back, body);
    }

    #[test]
    fn fixed_sizes_accept_integers() {
        let body: PhysicsBody =
            serde_json::from_value(json!({"shape": "circle", "radius": 12})).unwrap();
        assert_eq!(
            body.shape,
            BodyShape::Circle {
                radius: BodySize::Fixed(12.0)
            }
        );
        assert!(body.moves);
        assert_eq!(body.mass, 1.0);
    }

    #[test]
    fn bad_size_string_is_rejected() {
        let r: Result<BodySize, _> = serde_json::from_value(json!("big"));
        assert!(r.is_err());
    }

    #[test]
    fn resolve_keeps_fixed() {
        assert_eq!(BodySize::Fixed(4.0).resolve(99.0), 4.0);
        assert_eq!(BodySize::Auto.resolve(99.0), 99.0);
    }
}

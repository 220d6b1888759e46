//! Asset references and the resolver seam.
//!
//! Entities only store an [`AssetRef`] (pack, section, key, frame). What the
//! reference points at is answered by an external [`AssetResolver`]; resolved
//! descriptors are cached in an [`AssetTable`] on the document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssetRef
// ---------------------------------------------------------------------------

/// Pointer to externally managed art.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetRef {
    /// Url of the asset pack file, relative to the project.
    pub pack: String,
    /// Section of the pack the asset is declared in.
    #[serde(default)]
    pub section: String,
    /// Asset key inside the section.
    pub key: String,
    /// Frame key for atlases and sprite sheets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
}

impl AssetRef {
    pub fn new(pack: impl Into<String>, section: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            pack: pack.into(),
            section: section.into(),
            key: key.into(),
            frame: None,
        }
    }

    /// Builder-style frame setter.
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    /// The asset this reference points at, ignoring the frame.
    pub fn asset_key(&self) -> AssetKey {
        AssetKey {
            pack: self.pack.clone(),
            section: self.section.clone(),
            key: self.key.clone(),
        }
    }
}

/// Identity of an asset without the frame component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub pack: String,
    pub section: String,
    pub key: String,
}

// ---------------------------------------------------------------------------
// AssetDescriptor
// ---------------------------------------------------------------------------

/// What a resolver knows about an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Pack entry type (`image`, `spritesheet`, `atlas`, ...).
    #[serde(rename = "type")]
    pub asset_type: String,
    /// Url of the main file, if the entry has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Frame names known for atlases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,
    /// Natural frame width, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Natural frame height, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Why a reference could not be resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("asset pack '{pack}' not found")]
    PackNotFound { pack: String },

    #[error("asset '{key}' not found in section '{section}' of pack '{pack}'")]
    AssetNotFound {
        pack: String,
        section: String,
        key: String,
    },
}

/// Collaborator that turns references into descriptors.
pub trait AssetResolver {
    fn resolve(&self, asset: &AssetKey) -> Result<AssetDescriptor, ResolveError>;
}

impl<F> AssetResolver for F
where
    F: Fn(&AssetKey) -> Result<AssetDescriptor, ResolveError>,
{
    fn resolve(&self, asset: &AssetKey) -> Result<AssetDescriptor, ResolveError> {
        self(asset)
    }
}

/// Resolver that knows nothing. Every lookup reports the pack as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetResolver for NoAssets {
    fn resolve(&self, asset: &AssetKey) -> Result<AssetDescriptor, ResolveError> {
        Err(ResolveError::PackNotFound {
            pack: asset.pack.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// AssetTable
// ---------------------------------------------------------------------------

/// Descriptors resolved for the assets a document uses.
///
/// The table is transient: it is filled at load time and rebuilt before each
/// save, and it never takes part in document equality.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    entries: BTreeMap<AssetKey, AssetDescriptor>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: AssetKey, descriptor: AssetDescriptor) {
        self.entries.insert(key, descriptor);
    }

    pub fn get(&self, key: &AssetKey) -> Option<&AssetDescriptor> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetKey, &AssetDescriptor)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_resolvers() {
        let resolver = |key: &AssetKey| {
            if key.key == "hero" {
                Ok(AssetDescriptor {
                    asset_type: "image".to_owned(),
                    url: Some("hero.png".to_owned()),
                    frames: Vec::new(),
                    width: Some(32.0),
                    height: Some(48.0),
                })
            } else {
                Err(ResolveError::AssetNotFound {
                    pack: key.pack.clone(),
                    section: key.section.clone(),
                    key: key.key.clone(),
                })
            }
        };
        let hero = AssetRef::new("pack.json", "level", "hero");
        assert_eq!(resolver.resolve(&hero.asset_key()).unwrap().width, Some(32.0));
        let villain = AssetRef::new("pack.json", "level", "villain");
        assert!(resolver.resolve(&villain.asset_key()).is_err());
    }

    #[test]
    fn asset_key_drops_frame() {
        let a = AssetRef::new("p", "s", "atlas").with_frame("run0");
        let b = AssetRef::new("p", "s", "atlas").with_frame("run1");
        assert_eq!(a.asset_key(), b.asset_key());
    }
}

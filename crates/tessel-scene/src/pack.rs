//! Asset resolution from Phaser asset pack files.
//!
//! A pack is a JSON object mapping section names to arrays of entries; the
//! optional `meta` key is ignored:
//!
//! ```text
//! {
//!   "level": [
//!     { "type": "image",       "key": "sky",  "url": "assets/sky.png" },
//!     { "type": "spritesheet", "key": "dude", "url": "assets/dude.png",
//!       "frameWidth": 32, "frameHeight": 48, "frameMax": 9 },
//!     { "type": "atlas",       "key": "ui",   "textureURL": "assets/ui.png",
//!       "atlasURL": "assets/ui.json" }
//!   ],
//!   "meta": { ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde_json::Value;
use tracing::debug;

use tessel_model::asset::{AssetDescriptor, AssetKey, AssetResolver, ResolveError};

use crate::SceneError;

/// Section name -> asset key -> descriptor.
type Sections = BTreeMap<String, BTreeMap<String, AssetDescriptor>>;

/// In-memory index of one or more asset packs, keyed by pack url.
///
/// Urls are compared in normalized form: `./assets/pack.json`,
/// `assets/./pack.json` and `assets\pack.json` on Windows all name the same
/// pack.
#[derive(Debug, Clone, Default)]
pub struct PackIndex {
    packs: BTreeMap<String, Sections>,
}

impl PackIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index pack JSON text under `url`, replacing any pack with that url.
    pub fn add_pack_str(&mut self, url: impl Into<String>, text: &str) -> Result<(), SceneError> {
        let value: Value = serde_json::from_str(text)?;
        self.add_pack(url, &value)
    }

    /// Index a parsed pack under `url`.
    pub fn add_pack(&mut self, url: impl Into<String>, pack: &Value) -> Result<(), SceneError> {
        let url = pack_url(Path::new(&url.into()));
        let obj = pack.as_object().ok_or_else(|| SceneError::Malformed {
            details: format!("asset pack '{url}' must be an object"),
        })?;

        let mut sections = Sections::new();
        for (section, entries) in obj {
            if section == "meta" {
                continue;
            }
            let entries = entries.as_array().ok_or_else(|| SceneError::Malformed {
                details: format!("section '{section}' of pack '{url}' must be an array"),
            })?;
            let assets = sections.entry(section.clone()).or_default();
            for entry in entries {
                if let Some((key, descriptor)) = describe(entry) {
                    assets.insert(key, descriptor);
                }
            }
        }

        debug!(pack = %url, sections = sections.len(), "asset pack indexed");
        self.packs.insert(url, sections);
        Ok(())
    }

    /// Read and index a pack file. The pack url is the path, normalized.
    pub fn add_file(&mut self, path: &Path) -> Result<(), SceneError> {
        self.add_file_as(path, pack_url(path))
    }

    /// Read a pack file and index it under an explicit `url`, for packs
    /// whose scene-relative url differs from the path on disk.
    pub fn add_file_as(&mut self, path: &Path, url: impl Into<String>) -> Result<(), SceneError> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.add_pack_str(url, &text)
    }

    /// Number of indexed packs.
    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

impl AssetResolver for PackIndex {
    fn resolve(&self, asset: &AssetKey) -> Result<AssetDescriptor, ResolveError> {
        let sections = self
            .packs
            .get(&pack_url(Path::new(&asset.pack)))
            .ok_or_else(|| ResolveError::PackNotFound {
                pack: asset.pack.clone(),
            })?;
        sections
            .get(&asset.section)
            .and_then(|s| s.get(&asset.key))
            .cloned()
            .ok_or_else(|| ResolveError::AssetNotFound {
                pack: asset.pack.clone(),
                section: asset.section.clone(),
                key: asset.key.clone(),
            })
    }
}

/// `/`-separated url for `path` with `.` segments dropped.
fn pack_url(path: &Path) -> String {
    let mut root = String::new();
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => root.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => root.push('/'),
            Component::CurDir => {}
            Component::ParentDir => parts.push("..".to_owned()),
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }
    format!("{root}{}", parts.join("/"))
}

/// Turn one pack entry into a descriptor. Entries without a key are skipped.
fn describe(entry: &Value) -> Option<(String, AssetDescriptor)> {
    let key = entry.get("key")?.as_str()?.to_owned();
    let asset_type = entry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("image")
        .to_owned();
    let text = |field: &str| entry.get(field).and_then(Value::as_str).map(str::to_owned);
    let number = |field: &str| entry.get(field).and_then(Value::as_f64);

    let url = text("url").or_else(|| text("textureURL"));
    let (width, height) = (number("frameWidth"), number("frameHeight"));

    let frames = match asset_type.as_str() {
        "spritesheet" => {
            let max = number("frameMax").unwrap_or(0.0).max(0.0) as usize;
            (0..max).map(|i| i.to_string()).collect()
        }
        "atlas" | "atlasJSONHash" | "atlasJSONArray" => entry
            .get("atlasData")
            .map(atlas_frames)
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    Some((
        key,
        AssetDescriptor {
            asset_type,
            url,
            frames,
            width,
            height,
        },
    ))
}

/// Frame names from inline atlas data in either JSON-array or JSON-hash form.
fn atlas_frames(data: &Value) -> Vec<String> {
    match data.get("frames") {
        Some(Value::Array(frames)) => frames
            .iter()
            .filter_map(|f| f.get("filename").and_then(Value::as_str))
            .map(str::to_owned)
            .collect(),
        Some(Value::Object(frames)) => frames.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn sample() -> PackIndex {
        let mut index = PackIndex::new();
        index
            .add_pack(
                "assets/pack.json",
                &json!({
                    "level": [
                        {"type": "image", "key": "sky", "url": "assets/sky.png"},
                        {"type": "spritesheet", "key": "dude", "url": "assets/dude.png",
                         "frameWidth": 32, "frameHeight": 48, "frameMax": 3},
                        {"type": "atlas", "key": "ui", "textureURL": "assets/ui.png",
                         "atlasData": {"frames": [{"filename": "btn"}, {"filename": "panel"}]}},
                        {"type": "audio"}
                    ],
                    "meta": {"app": "tessel"}
                }),
            )
            .unwrap();
        index
    }

    fn key(section: &str, key: &str) -> AssetKey {
        AssetKey {
            pack: "assets/pack.json".to_owned(),
            section: section.to_owned(),
            key: key.to_owned(),
        }
    }

    #[test]
    fn resolves_entries_by_section_and_key() {
        let index = sample();
        let sky = index.resolve(&key("level", "sky")).unwrap();
        assert_eq!(sky.asset_type, "image");
        assert_eq!(sky.url.as_deref(), Some("assets/sky.png"));

        let dude = index.resolve(&key("level", "dude")).unwrap();
        assert_eq!(dude.frames, ["0", "1", "2"]);
        assert_eq!(dude.width, Some(32.0));

        let ui = index.resolve(&key("level", "ui")).unwrap();
        assert_eq!(ui.url.as_deref(), Some("assets/ui.png"));
        assert_eq!(ui.frames, ["btn", "panel"]);
    }

    #[test]
    fn missing_pack_and_key_are_distinguished() {
        let index = sample();
        assert!(matches!(
            index.resolve(&key("level", "moon")),
            Err(ResolveError::AssetNotFound { .. })
        ));
        let mut other = key("level", "sky");
        other.pack = "other.json".to_owned();
        assert!(matches!(
            index.resolve(&other),
            Err(ResolveError::PackNotFound { .. })
        ));
    }

    #[test]
    fn non_array_section_is_malformed() {
        let mut index = PackIndex::new();
        let err = index.add_pack("p.json", &json!({"level": 3})).unwrap_err();
        assert!(matches!(err, SceneError::Malformed { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn packs_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"boot": [{{"type": "image", "key": "logo", "url": "logo.png"}}]}}"#).unwrap();
        let mut index = PackIndex::new();
        index.add_file(file.path()).unwrap();

        let logo = AssetKey {
            pack: file.path().to_string_lossy().into_owned(),
            section: "boot".to_owned(),
            key: "logo".to_owned(),
        };
        assert!(index.resolve(&logo).is_ok());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn dot_segments_do_not_change_the_pack_url() {
        let mut index = PackIndex::new();
        index
            .add_pack("./assets/pack.json", &json!({"level": [{"key": "sky"}]}))
            .unwrap();
        let mut sky = key("level", "sky");
        sky.pack = "assets/pack.json".to_owned();
        assert!(index.resolve(&sky).is_ok());
        sky.pack = "assets/./pack.json".to_owned();
        assert!(index.resolve(&sky).is_ok());
    }

    #[test]
    fn files_can_be_indexed_under_an_explicit_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack.json");
        std::fs::write(&path, r#"{"boot": [{"key": "logo"}]}"#).unwrap();

        let mut index = PackIndex::new();
        index.add_file(&dir.path().join(".").join("pack.json")).unwrap();
        index.add_file_as(&path, "assets/pack.json").unwrap();

        let mut logo = key("boot", "logo");
        logo.pack = path.to_string_lossy().into_owned();
        assert!(index.resolve(&logo).is_ok());
        logo.pack = "assets/pack.json".to_owned();
        assert!(index.resolve(&logo).is_ok());
        assert_eq!(index.len(), 2);
    }
}

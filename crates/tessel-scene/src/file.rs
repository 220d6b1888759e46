//! Serde shapes of the on-disk scene file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tessel_model::asset::{AssetDescriptor, AssetRef};
use tessel_model::settings::SceneSettings;

/// Top-level scene file object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFile {
    pub version: u64,
    #[serde(default)]
    pub settings: SceneSettings,
    pub world: Value,
    #[serde(rename = "asset-table", default)]
    pub asset_table: Vec<TableEntry>,
}

/// One row of the asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Id referenced by node `texture` fields.
    pub id: String,
    pub pack: String,
    #[serde(default)]
    pub section: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    /// Descriptor resolved at save time. Informational; loads resolve again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<AssetDescriptor>,
}

impl TableEntry {
    pub fn asset(&self) -> AssetRef {
        AssetRef {
            pack: self.pack.clone(),
            section: self.section.clone(),
            key: self.key.clone(),
            frame: self.frame.clone(),
        }
    }
}

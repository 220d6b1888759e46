//! Document -> scene file.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use tessel_model::asset::{AssetRef, AssetResolver, AssetTable};
use tessel_model::codec::encode_subtree;
use tessel_model::document::Document;

use crate::file::{SceneFile, TableEntry};
use crate::load::LoadIssue;
use crate::{SceneError, FORMAT_VERSION};

/// Result of serializing a document.
#[derive(Debug, Clone)]
pub struct SaveOutput {
    /// Pretty-printed scene file text.
    pub file: String,
    /// The rebuilt asset table, holding every descriptor the resolver knew.
    pub assets: AssetTable,
    /// References the resolver could not answer. They are still written.
    pub issues: Vec<LoadIssue>,
}

/// Assigns table ids in order of first use.
#[derive(Default)]
struct TableBuilder {
    ids: BTreeMap<AssetRef, String>,
    order: Vec<AssetRef>,
}

impl TableBuilder {
    fn id_for(&mut self, asset: &AssetRef) -> String {
        if let Some(id) = self.ids.get(asset) {
            return id.clone();
        }
        let id = self.order.len().to_string();
        self.ids.insert(asset.clone(), id.clone());
        self.order.push(asset.clone());
        id
    }
}

/// Serialize `doc` to scene file text.
///
/// The asset table is rebuilt from the textures the tree actually uses.
/// Descriptors come from `resolver`; when it fails, the document's previous
/// descriptor (if any) is kept and the failure is reported in
/// [`SaveOutput::issues`].
pub fn to_json(doc: &Document, resolver: &dyn AssetResolver) -> Result<SaveOutput, SceneError> {
    let mut table = TableBuilder::default();
    let world = encode_subtree(doc, doc.root_id(), &mut |asset| {
        Value::String(table.id_for(asset))
    })?;

    let mut assets = AssetTable::new();
    let mut issues = Vec::new();
    let mut entries = Vec::with_capacity(table.order.len());
    for asset in table.order {
        let key = asset.asset_key();
        let descriptor = match assets.get(&key) {
            Some(known) => Some(known.clone()),
            None => match resolver.resolve(&key) {
                Ok(descriptor) => {
                    assets.insert(key.clone(), descriptor.clone());
                    Some(descriptor)
                }
                Err(reason) => {
                    warn!(pack = %asset.pack, section = %asset.section, key = %asset.key, error = %reason, "asset unresolved at save");
                    issues.push(LoadIssue::AssetUnresolved {
                        asset: asset.clone(),
                        reason,
                    });
                    doc.assets().get(&key).cloned()
                }
            },
        };
        entries.push(TableEntry {
            id: table.ids.get(&asset).cloned().unwrap_or_default(),
            pack: asset.pack,
            section: asset.section,
            key: asset.key,
            frame: asset.frame,
            descriptor,
        });
    }

    let file = SceneFile {
        version: FORMAT_VERSION,
        settings: doc.settings().clone(),
        world,
        asset_table: entries,
    };
    let text = serde_json::to_string_pretty(&file)?;
    debug!(entities = doc.len(), assets = file.asset_table.len(), bytes = text.len(), "scene serialized");

    Ok(SaveOutput {
        file: text,
        assets,
        issues,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

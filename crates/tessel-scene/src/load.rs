//! Scene file -> document.
//!
//! Structural problems (bad JSON, unknown node types, newer format versions)
//! abort the load. Asset problems do not: an unresolvable asset or a texture
//! pointing at a missing table row is recorded as a [`LoadIssue`] and the
//! scene still opens.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{info, warn};

use tessel_model::asset::{AssetKey, AssetRef, AssetResolver, AssetTable, ResolveError};
use tessel_model::codec::{decode_inline_texture, decode_subtree};
use tessel_model::document::Document;
use tessel_model::ModelError;

use crate::file::SceneFile;
use crate::{SceneError, FORMAT_VERSION};

// ---------------------------------------------------------------------------
// Load results
// ---------------------------------------------------------------------------

/// A non-fatal problem found while loading or saving.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadIssue {
    /// The resolver does not know this asset.
    #[error("unresolved asset {}/{}/{}: {reason}", .asset.pack, .asset.section, .asset.key)]
    AssetUnresolved { asset: AssetRef, reason: ResolveError },

    /// A node texture names a row missing from the asset table. The texture
    /// was dropped.
    #[error("texture refers to missing asset-table row '{table_id}'")]
    DanglingReference { table_id: String },
}

/// Outcome of a load that produced a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStatus {
    pub issues: Vec<LoadIssue>,
}

impl LoadStatus {
    /// `true` when nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn unresolved_assets(&self) -> impl Iterator<Item = &AssetRef> {
        self.issues.iter().filter_map(|issue| match issue {
            LoadIssue::AssetUnresolved { asset, .. } => Some(asset),
            LoadIssue::DanglingReference { .. } => None,
        })
    }
}

/// A loaded document plus what went wrong on the way.
#[derive(Debug)]
pub struct LoadOutcome {
    pub document: Document,
    pub status: LoadStatus,
}

// ---------------------------------------------------------------------------
// from_json
// ---------------------------------------------------------------------------

/// Parse scene file text into a clean document.
pub fn from_json(text: &str, resolver: &dyn AssetResolver) -> Result<LoadOutcome, SceneError> {
    let raw: Value = serde_json::from_str(text)?;
    check_version(&raw)?;
    let file: SceneFile = serde_json::from_value(raw).map_err(|e| SceneError::Malformed {
        details: e.to_string(),
    })?;

    let mut status = LoadStatus::default();

    // Resolve each distinct asset once; rows differing only by frame share it.
    let mut rows: HashMap<String, AssetRef> = HashMap::with_capacity(file.asset_table.len());
    let mut assets = AssetTable::new();
    let mut unresolved: HashSet<AssetKey> = HashSet::new();
    for entry in &file.asset_table {
        let asset = entry.asset();
        let key = asset.asset_key();
        if assets.get(&key).is_none() && !unresolved.contains(&key) {
            match resolver.resolve(&key) {
                Ok(descriptor) => assets.insert(key, descriptor),
                Err(reason) => {
                    warn!(pack = %asset.pack, section = %asset.section, key = %asset.key, error = %reason, "asset unresolved at load");
                    unresolved.insert(key.clone());
                    if let Some(cached) = &entry.descriptor {
                        assets.insert(key, cached.clone());
                    }
                    status.issues.push(LoadIssue::AssetUnresolved {
                        asset: asset.clone(),
                        reason,
                    });
                }
            }
        }
        if rows.insert(entry.id.clone(), asset).is_some() {
            warn!(table_id = %entry.id, "duplicate asset-table id -- last row wins");
        }
    }

    let mut dangling = Vec::new();
    let world = decode_subtree(&file.world, &mut |value| match value {
        Value::String(table_id) => match rows.get(table_id) {
            Some(asset) => Ok(Some(asset.clone())),
            None => {
                dangling.push(table_id.clone());
                Ok(None)
            }
        },
        Value::Object(_) | Value::Null => decode_inline_texture(value),
        other => Err(ModelError::Malformed {
            details: format!("texture must be an asset-table id, found {other}"),
        }),
    })?;
    for table_id in dangling {
        warn!(table_id = %table_id, "dangling asset-table reference -- texture dropped");
        status.issues.push(LoadIssue::DanglingReference { table_id });
    }

    let document = Document::from_tree(world, file.settings, assets)?;
    info!(
        entities = document.len(),
        issues = status.issues.len(),
        "scene loaded"
    );
    Ok(LoadOutcome { document, status })
}

fn check_version(raw: &Value) -> Result<(), SceneError> {
    let obj = raw.as_object().ok_or_else(|| SceneError::Malformed {
        details: "top level must be an object".to_owned(),
    })?;
    let version = obj
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| SceneError::Malformed {
            details: "missing or non-integer 'version'".to_owned(),
        })?;
    if version == 0 || version > FORMAT_VERSION {
        return Err(SceneError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

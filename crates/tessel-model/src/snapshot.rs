//! Immutable document snapshots.
//!
//! A [`DocumentSnapshot`] is a self-contained copy of the model state (tree
//! and settings) that can cross thread boundaries, e.g. to a background code
//! generation worker. It carries a BLAKE3 hex digest of its canonical JSON
//! form, which doubles as a cheap "did anything change" check.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::asset::AssetTable;
use crate::codec::{decode_subtree_inline, encode_subtree_inline};
use crate::document::Document;
use crate::settings::SceneSettings;
use crate::ModelError;

// ---------------------------------------------------------------------------
// DocumentSnapshot
// ---------------------------------------------------------------------------

/// A serializable copy of a document's model state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub settings: SceneSettings,
    /// The world tree in the inline node encoding.
    pub world: Value,
    /// BLAKE3 hex digest (64 lowercase hex chars) of `settings` + `world`.
    pub hash: String,
}

/// Hash the canonical JSON form of the model state. `serde_json` maps are
/// key-sorted, so equal states always produce equal bytes.
fn compute_hash(settings: &SceneSettings, world: &Value) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        settings: &'a SceneSettings,
        world: &'a Value,
    }

    let bytes = serde_json::to_vec(&HashableState { settings, world }).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

impl DocumentSnapshot {
    /// Whether `hash` still matches the content.
    pub fn verify(&self) -> bool {
        compute_hash(&self.settings, &self.world) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Document snapshot/restore methods
// ---------------------------------------------------------------------------

impl Document {
    pub fn capture_snapshot(&self) -> DocumentSnapshot {
        // The root always exists, so encoding cannot fail on a live document.
        let world = encode_subtree_inline(self, self.root_id()).unwrap_or(Value::Null);
        let settings = self.settings().clone();
        let hash = compute_hash(&settings, &world);
        DocumentSnapshot {
            settings,
            world,
            hash,
        }
    }

    /// Rebuild a clean document from a snapshot. The asset table starts empty.
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Document, ModelError> {
        let tree = decode_subtree_inline(&snapshot.world)?;
        Document::from_tree(tree, snapshot.settings.clone(), AssetTable::new())
    }

    /// BLAKE3 digest of the current model state.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Tessel scene files -- JSON persistence for [`Document`]s.
//!
//! A scene file is a versioned JSON object:
//!
//! ```text
//! {
//!   "version": 1,
//!   "settings": { ... },
//!   "world": { "type": "group", "id": "...", "children": [ ... ] },
//!   "asset-table": [ { "id": "0", "pack": "...", "section": "...", "key": "...",
//!                      "frame": "...", "descriptor": { ... } } ]
//! }
//! ```
//!
//! Node textures inside `world` are ids into `asset-table`. The table is
//! rebuilt from the document on every save, so it only ever lists assets
//! that are actually referenced.
//!
//! # Modules
//!
//! - [`save`]: [`to_json`] and the save-side asset table builder.
//! - [`load`]: [`from_json`] with non-fatal [`LoadIssue`] reporting.
//! - [`pack`]: [`PackIndex`], an asset resolver built from Phaser asset packs.
//!
//! [`Document`]: tessel_model::document::Document

#![deny(unsafe_code)]

pub mod file;
pub mod load;
pub mod pack;
pub mod save;

pub use load::{from_json, LoadIssue, LoadOutcome, LoadStatus};
pub use pack::PackIndex;
pub use save::{to_json, SaveOutput};

use tessel_model::ModelError;

/// Scene file format version written by this crate. Files with a greater
/// version are refused.
pub const FORMAT_VERSION: u64 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a scene load or save.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The text is not valid JSON.
    #[error("scene file is not valid JSON: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    /// The file was written by a newer format version.
    #[error("scene format version {found} is not supported (this build reads up to {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    /// A node discriminant is missing or unknown.
    #[error("unknown object type {}", .found.as_deref().unwrap_or("(missing)"))]
    UnknownType { found: Option<String> },

    /// The file is valid JSON but not a scene.
    #[error("malformed scene file: {details}")]
    Malformed { details: String },

    /// The decoded tree violates a model invariant.
    #[error(transparent)]
    Model(ModelError),

    /// An asset pack file could not be read.
    #[error("cannot read asset pack '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ModelError> for SceneError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnknownType { found } => SceneError::UnknownType { found },
            other => SceneError::Model(other),
        }
    }
}

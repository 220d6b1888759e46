//! Tessel editor -- an editing session over one scene file.
//!
//! An [`EditorSession`] ties together the operation engine, the scene file on
//! disk and the generated source next to it. Edits go through
//! [`EditorSession::apply`]; [`EditorSession::save`] writes the scene
//! atomically and regenerates code when the scene asks for it.
//!
//! Code generation can also run off the editing thread through a
//! [`GenerationWorker`], which only ever sees serialized snapshots.

#![deny(unsafe_code)]

pub mod config;
pub mod session;
pub mod worker;

use std::path::PathBuf;

use tessel_codegen::CodegenError;
use tessel_model::operation::OpError;
use tessel_scene::SceneError;

pub use config::EditorConfig;
pub use session::{EditorSession, GenerationOutcome, SaveReport};
pub use worker::{GenerationTicket, GenerationWorker};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Operation(#[from] OpError),

    #[error(transparent)]
    Generation(#[from] CodegenError),

    /// The background worker failed or went away.
    #[error("generation worker: {details}")]
    Worker { details: String },
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}

//! Session configuration.

use std::path::PathBuf;

use tessel_codegen::CodegenConfig;
use tessel_model::engine::EngineConfig;

/// Configuration for an [`EditorSession`](crate::EditorSession).
#[derive(Debug, Clone, Default)]
pub struct EditorConfig {
    pub engine: EngineConfig,
    pub codegen: CodegenConfig,
    /// Directory for generated sources. `None` writes next to the scene.
    pub output_dir: Option<PathBuf>,
}

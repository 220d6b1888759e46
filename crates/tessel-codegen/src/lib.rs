//! Tessel codegen -- Phaser source code from a scene document.
//!
//! Generation is a pure projection of a [`Document`]: the same document and
//! the same previous file text always give the same output. The generated
//! code lives between two markers; code written around them survives
//! regeneration untouched.
//!
//! # Quick Start
//!
//! ```
//! use tessel_codegen::generate;
//! use tessel_model::prelude::*;
//! use serde_json::json;
//!
//! let mut engine = OperationEngine::new(Document::new());
//! let world = engine.document().root_id().clone();
//! engine
//!     .apply(Operation::add_node(json!({"type": "sprite", "editor": {"name": "hero"}}), &world, 10.0, 20.0))
//!     .unwrap();
//!
//! let first = generate(engine.document(), None).unwrap();
//! assert!(first.contains("this.add.sprite(10, 20);"));
//!
//! // Hand edits outside the region are kept.
//! let edited = first.replace("// user code here", "update() { }");
//! let second = generate(engine.document(), Some(&edited)).unwrap();
//! assert!(second.contains("update() { }"));
//! ```

#![deny(unsafe_code)]

pub mod builder;
pub mod region;
pub mod template;

use tracing::debug;

use tessel_model::document::Document;

pub use region::MarkerProblem;

// ---------------------------------------------------------------------------
// Errors / config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    /// The previous file's markers cannot be merged into.
    #[error("cannot update generated region: {problem}")]
    Generation { problem: MarkerProblem },
}

/// Marker and formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    pub begin_marker: String,
    pub end_marker: String,
    /// One level of indentation.
    pub indent: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            begin_marker: "/*GEN-BEGIN*/".to_owned(),
            end_marker: "/*GEN-END*/".to_owned(),
            indent: "\t".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Class name used when neither the settings nor the caller provide one.
pub const DEFAULT_CLASS_NAME: &str = "Scene";

#[derive(Debug, Clone)]
pub struct Generator {
    config: CodegenConfig,
    fallback_class: String,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(CodegenConfig::default())
    }
}

impl Generator {
    pub fn new(config: CodegenConfig) -> Self {
        Self {
            config,
            fallback_class: DEFAULT_CLASS_NAME.to_owned(),
        }
    }

    /// Class name used when the scene settings leave `className` unset,
    /// typically the scene file stem.
    pub fn with_fallback_class(mut self, name: impl Into<String>) -> Self {
        self.fallback_class = name.into();
        self
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Generate source for `doc`.
    ///
    /// With `previous` holding one marker pair, only the region interior is
    /// replaced. With no previous text, or text without markers, a fresh
    /// file is produced.
    pub fn generate(&self, doc: &Document, previous: Option<&str>) -> Result<String, CodegenError> {
        let settings = doc.settings();
        let class_name = settings
            .class_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.fallback_class);

        let unit = builder::build(doc, class_name);
        let template = template::template_for(settings.output_language);
        let interior = template::render_region(template, &unit, &self.config.indent);

        let (begin, end) = (&self.config.begin_marker, &self.config.end_marker);
        // Scene strings reach the output verbatim apart from comment
        // delimiters, so a custom marker could otherwise leak into it.
        for marker in [begin, end] {
            if interior.contains(marker.as_str()) || unit.super_class.contains(marker.as_str()) {
                return Err(CodegenError::Generation {
                    problem: MarkerProblem::Embedded {
                        marker: marker.clone(),
                    },
                });
            }
        }
        if let Some(prev) = previous {
            if let Some(merged) = region::merge(prev, &interior, begin, end)? {
                debug!(class = %unit.class_name, bytes = merged.len(), "generated region merged");
                return Ok(merged);
            }
        }

        let file = template::render_scaffold(&unit, &interior, begin, end, &self.config.indent);
        debug!(class = %unit.class_name, bytes = file.len(), "generated fresh file");
        Ok(file)
    }
}

/// Generate with the default configuration.
pub fn generate(doc: &Document, previous: Option<&str>) -> Result<String, CodegenError> {
    Generator::default().generate(doc, previous)
}

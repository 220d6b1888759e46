//! Scene-level settings persisted alongside the object tree.

use serde::{Deserialize, Serialize};

/// Target language of the generated source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputLanguage {
    #[default]
    JavaScript,
    TypeScript,
}

impl OutputLanguage {
    /// File extension of the generated file, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputLanguage::JavaScript => "js",
            OutputLanguage::TypeScript => "ts",
        }
    }
}

/// Settings of one scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneSettings {
    pub width: f64,
    pub height: f64,
    pub background_color: String,
    pub snap_enabled: bool,
    pub snap_width: f64,
    pub snap_height: f64,
    pub generate_on_save: bool,
    pub output_language: OutputLanguage,
    /// Class name of the generated scene. Defaults to the file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub super_class: String,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            background_color: "#6495ed".to_owned(),
            snap_enabled: false,
            snap_width: 16.0,
            snap_height: 16.0,
            generate_on_save: true,
            output_language: OutputLanguage::JavaScript,
            class_name: None,
            super_class: "Phaser.State".to_owned(),
        }
    }
}

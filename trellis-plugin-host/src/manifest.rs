//! Plugin directory files: `plugin.toml` (manifest) and `entry.toml` (entry module).

use crate::error::PluginHostError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use trellis_types::PageDefinition;

/// Manifest file name inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.toml";
/// Entry module file name inside a plugin directory.
pub const ENTRY_FILE: &str = "entry.toml";

/// Identity and metadata of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin identifier (e.g., "hello").
    pub id: String,
    /// Human-readable plugin name.
    pub name: String,
    /// Semver version string.
    pub version: String,
    /// Short description.
    pub description: String,
    /// Author or organization.
    pub author: String,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "0.1.0".to_string(),
            description: String::new(),
            author: String::new(),
        }
    }

    /// Parses `plugin.toml` content. A missing `id` falls back to
    /// `fallback_id` (the directory name), a missing `name` to the id.
    pub fn from_toml_str(content: &str, fallback_id: &str) -> Result<Self, toml::de::Error> {
        let raw: ManifestFile = toml::from_str(content)?;
        let id = raw.id.unwrap_or_else(|| fallback_id.to_string());
        Ok(Self {
            name: raw.name.unwrap_or_else(|| id.clone()),
            id,
            version: raw.version,
            description: raw.description,
            author: raw.author,
        })
    }

    /// Reads `<dir>/plugin.toml`.
    pub fn load(dir: &Path) -> Result<Self, PluginHostError> {
        let fallback_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Self::from_toml_str(&content, &fallback_id).map_err(|e| PluginHostError::InvalidPluginFile {
            dir: dir.to_path_buf(),
            file: MANIFEST_FILE,
            message: e.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ManifestFile {
    id: Option<String>,
    name: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    author: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Declarative entry module of a directory plugin.
///
/// ```toml
/// builtin = "hello"
///
/// [[pages]]
/// path = "/gallery"
/// name = "Gallery"
/// componentTemplate = "<div>Gallery</div>"
/// componentScript = '{"data": {}}'
///
/// [[endpoints]]
/// path = "/api/gallery/info"
/// body = { version = 1 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntryModule {
    /// Name of a compiled-in extension to run after the declarative parts.
    #[serde(default)]
    pub builtin: Option<String>,
    #[serde(default)]
    pub pages: Vec<PageDefinition>,
    #[serde(default)]
    pub endpoints: Vec<StaticEndpoint>,
}

/// A `GET` route answering with a fixed JSON body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaticEndpoint {
    pub path: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl EntryModule {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reads `<dir>/entry.toml`.
    pub fn load(dir: &Path) -> Result<Self, PluginHostError> {
        let content = std::fs::read_to_string(dir.join(ENTRY_FILE))?;
        Self::from_toml_str(&content).map_err(|e| PluginHostError::InvalidPluginFile {
            dir: dir.to_path_buf(),
            file: ENTRY_FILE,
            message: e.to_string(),
        })
    }
}

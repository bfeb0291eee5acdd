//! Server configuration, read from a TOML file.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [storage]
//! database = "trellis.db"
//!
//! [plugins]
//! root = "plugins"
//! bundled = true
//! mode = "denylist"
//! denied = ["experimental"]
//!
//! [auth]
//! key_path = "trellis-auth.key"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use trellis_plugin_host::PluginPolicy;

/// Value of `storage.database` that selects an in-memory store.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub plugins: PluginsSection,
    pub auth: AuthSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub database: String,
}

impl StorageSection {
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database: "trellis.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsSection {
    /// Directory scanned for plugin directories.
    pub root: PathBuf,
    /// Whether the compiled-in extensions load at boot.
    pub bundled: bool,
    #[serde(flatten)]
    pub policy: PluginPolicy,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("plugins"),
            bundled: true,
            policy: PluginPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// File holding the 32-byte Ed25519 signing seed.
    pub key_path: PathBuf,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from("trellis-auth.key"),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the config at `path`. A missing or unparsable file yields the
    /// defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {:?}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }
}

//! Operator policy deciding which plugins may load.

use serde::{Deserialize, Serialize};

/// Plugin policy mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// No restrictions on plugin loading.
    #[default]
    Unrestricted,
    /// Only plugins listed in `allowed` load.
    Allowlist,
    /// Every plugin except those listed in `denied` loads.
    Denylist,
}

/// Policy configuration, read from the `[plugins]` section of the server config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginPolicy {
    pub mode: PolicyMode,
    pub allowed: Vec<String>,
    pub denied: Vec<String>,
}

impl PluginPolicy {
    pub fn allowlist<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: PolicyMode::Allowlist,
            allowed: ids.into_iter().map(Into::into).collect(),
            denied: Vec::new(),
        }
    }

    pub fn denylist<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: PolicyMode::Denylist,
            allowed: Vec::new(),
            denied: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a plugin is allowed to load.
    pub fn is_plugin_allowed(&self, plugin_id: &str) -> bool {
        match self.mode {
            PolicyMode::Unrestricted => true,
            PolicyMode::Allowlist => self.allowed.iter().any(|id| id == plugin_id),
            PolicyMode::Denylist => !self.denied.iter().any(|id| id == plugin_id),
        }
    }
}

//! Error types for the plugin host.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginHostError {
    #[error("plugin already loaded: {0}")]
    PluginAlreadyLoaded(String),

    #[error("plugin crashed: {plugin_id}: {message}")]
    PluginCrashed { plugin_id: String, message: String },

    #[error("plugin initialization failed: {plugin_id}: {message}")]
    InitializationFailed { plugin_id: String, message: String },

    #[error("route conflict: plugin '{plugin_id}' cannot register '{path}': {reason}")]
    RouteConflict {
        plugin_id: String,
        path: String,
        reason: &'static str,
    },

    #[error("policy denied: {0}")]
    PolicyDenied(String),

    #[error("invalid {file} in {}: {message}", .dir.display())]
    InvalidPluginFile {
        dir: PathBuf,
        file: &'static str,
        message: String,
    },

    #[error("plugin '{plugin_id}' names unknown builtin '{builtin}'")]
    UnknownBuiltin { plugin_id: String, builtin: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

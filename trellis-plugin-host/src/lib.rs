//! Extension host for Trellis.
//!
//! Loads extensions once at boot, hands each one its capabilities (route
//! registrar, persistence handle, page registrar) and contains any failure
//! so that one broken extension never stops the others or the host.
//!
//! Extensions come from two places:
//! - compiled-in [`Extension`] implementations passed to [`PluginHost::load_all`]
//! - plugin directories holding `plugin.toml` and a declarative `entry.toml`,
//!   found by [`PluginHost::discover_and_load`]

mod error;
mod extension;
mod guard;
mod host;
mod manifest;
mod policy;

pub use error::PluginHostError;
pub use extension::{Capabilities, Extension, PageRegistrar, RouteRegistrar};
pub use host::{LoadEntry, LoadOutcome, LoadReport, PluginHost};
pub use manifest::{EntryModule, PluginManifest, StaticEndpoint, ENTRY_FILE, MANIFEST_FILE};
pub use policy::{PluginPolicy, PolicyMode};

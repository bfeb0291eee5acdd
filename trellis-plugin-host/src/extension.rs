//! The extension point and the capabilities handed to extensions.

use crate::error::PluginHostError;
use axum::routing::MethodRouter;
use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, warn};
use trellis_storage::{PageRegistry, RegistryError, RowStore, UpsertOutcome};
use trellis_types::PageDefinition;

/// A compiled-in extension.
///
/// `init` runs once, synchronously, before the host starts serving. It may
/// return an error or even panic; either way the host logs the failure and
/// none of the routes it registered are kept.
pub trait Extension: Send + Sync {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()>;
}

/// Everything an extension may touch during `init`.
pub struct Capabilities<'a> {
    routes: RouteRegistrar<'a>,
    store: Arc<dyn RowStore>,
    pages: PageRegistrar<'a>,
}

impl<'a> Capabilities<'a> {
    pub(crate) fn new(
        plugin_id: &'a str,
        taken_paths: &'a HashSet<String>,
        store: Arc<dyn RowStore>,
        registry: &'a PageRegistry,
    ) -> Self {
        Self {
            routes: RouteRegistrar::new(plugin_id, taken_paths),
            store,
            pages: PageRegistrar { plugin_id, registry },
        }
    }

    pub fn plugin_id(&self) -> &str {
        self.routes.plugin_id
    }

    /// The route registrar.
    pub fn routes(&mut self) -> &mut RouteRegistrar<'a> {
        &mut self.routes
    }

    /// The persistence handle.
    pub fn store(&self) -> Arc<dyn RowStore> {
        Arc::clone(&self.store)
    }

    /// Publishes a page definition. See [`PageRegistrar::register`].
    pub fn register_page(&self, def: &PageDefinition) -> Option<UpsertOutcome> {
        self.pages.register(def)
    }

    pub(crate) fn into_staged(self) -> (Router, Vec<String>) {
        (self.routes.staged, self.routes.paths)
    }
}

/// Stages one plugin's routes until its `init` has succeeded.
pub struct RouteRegistrar<'a> {
    plugin_id: &'a str,
    taken: &'a HashSet<String>,
    staged: Router,
    paths: Vec<String>,
}

impl<'a> RouteRegistrar<'a> {
    fn new(plugin_id: &'a str, taken: &'a HashSet<String>) -> Self {
        Self {
            plugin_id,
            taken,
            staged: Router::new(),
            paths: Vec::new(),
        }
    }

    /// Registers `method_router` at `path`.
    ///
    /// Paths must start with `/` and must not already belong to the host or
    /// to an earlier plugin. A plugin may register several methods on the
    /// same path.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> Result<(), PluginHostError> {
        if !path.starts_with('/') {
            return Err(self.conflict(path, "path must start with '/'"));
        }
        if self.taken.contains(path) {
            return Err(self.conflict(path, "path already registered"));
        }

        let staged = std::mem::take(&mut self.staged);
        self.staged = staged.route(path, method_router);
        if !self.paths.iter().any(|p| p == path) {
            self.paths.push(path.to_string());
        }
        Ok(())
    }

    fn conflict(&self, path: &str, reason: &'static str) -> PluginHostError {
        PluginHostError::RouteConflict {
            plugin_id: self.plugin_id.to_string(),
            path: path.to_string(),
            reason,
        }
    }
}

/// Plugin-facing wrapper around the page registry.
///
/// Every outcome is logged with the plugin id; no error reaches plugin code.
pub struct PageRegistrar<'a> {
    plugin_id: &'a str,
    registry: &'a PageRegistry,
}

impl PageRegistrar<'_> {
    /// Inserts or updates `def`. Returns `None` if it was rejected.
    pub fn register(&self, def: &PageDefinition) -> Option<UpsertOutcome> {
        match self.registry.register_page(def) {
            Ok(outcome) => Some(outcome),
            Err(RegistryError::Validation(e)) => {
                warn!(plugin_id = %self.plugin_id, page = %def.name, "Invalid page definition: {e}");
                None
            }
            Err(RegistryError::Storage(e)) => {
                error!(plugin_id = %self.plugin_id, page = %def.name, "Failed to store page: {e}");
                None
            }
        }
    }
}

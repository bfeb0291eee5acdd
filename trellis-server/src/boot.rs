//! Boot sequence: open storage, load extensions, assemble the router.

use crate::builtin::{HelloExtension, HELLO_BUILTIN};
use crate::config::{ServerConfig, StorageSection};
use crate::{build_router, AppState, REGISTRY_PATH};
use anyhow::{Context, Result};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use trellis_auth::CredentialVerifier;
use trellis_plugin_host::{Extension, LoadReport, PluginHost};
use trellis_storage::{PageRegistry, SqliteStore};

/// A booted host, ready to serve.
pub struct Booted {
    pub router: Router,
    pub registry: Arc<PageRegistry>,
    /// Outcomes for the compiled-in extensions.
    pub bundled: LoadReport,
    /// Outcomes for plugin directories under `plugins.root`.
    pub discovered: LoadReport,
}

/// Opens the configured store and the page registry on top of it.
pub fn open_registry(storage: &StorageSection) -> Result<Arc<PageRegistry>> {
    let store = if storage.is_in_memory() {
        SqliteStore::open_in_memory().context("Failed to open in-memory store")?
    } else {
        SqliteStore::open(Path::new(&storage.database))
            .with_context(|| format!("Failed to open database {}", storage.database))?
    };
    let registry = PageRegistry::open(store).context("Failed to prepare page registry")?;
    Ok(Arc::new(registry))
}

/// Loads every extension once and builds the host router.
///
/// Extension failures are contained and reported; only storage errors fail
/// the boot.
pub fn boot(config: &ServerConfig, verifier: Arc<dyn CredentialVerifier>) -> Result<Booted> {
    let registry = open_registry(&config.storage)?;

    let mut host = PluginHost::with_policy(Arc::clone(&registry), config.plugins.policy.clone());
    host.reserve_path(REGISTRY_PATH);
    let hello: Arc<dyn Extension> = Arc::new(HelloExtension);
    host.register_builtin(HELLO_BUILTIN, Arc::clone(&hello));

    let bundled = if config.plugins.bundled {
        host.load_all([(HelloExtension::manifest(), hello)])
    } else {
        LoadReport::default()
    };
    let discovered = host.discover_and_load(&config.plugins.root);

    info!(
        loaded = host.plugin_count(),
        failed = bundled.failed().len() + discovered.failed().len(),
        skipped = bundled.skipped().len() + discovered.skipped().len(),
        "Extensions loaded"
    );

    let state = AppState {
        registry: Arc::clone(&registry),
        verifier,
    };
    let router = build_router(state, host.into_router());

    Ok(Booted {
        router,
        registry,
        bundled,
        discovered,
    })
}

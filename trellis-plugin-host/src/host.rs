//! Plugin lifecycle: loading, fault isolation and route assembly.

use crate::error::PluginHostError;
use crate::extension::{Capabilities, Extension};
use crate::guard;
use crate::manifest::{EntryModule, PluginManifest, ENTRY_FILE, MANIFEST_FILE};
use crate::policy::PluginPolicy;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use trellis_storage::{PageRegistry, RowStore};

/// What happened to one plugin candidate.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    Skipped(String),
    Failed(PluginHostError),
}

#[derive(Debug)]
pub struct LoadEntry {
    pub plugin_id: String,
    pub outcome: LoadOutcome,
}

/// Per-candidate results of a loading pass, in load order.
#[derive(Debug, Default)]
pub struct LoadReport {
    entries: Vec<LoadEntry>,
}

impl LoadReport {
    pub fn entries(&self) -> &[LoadEntry] {
        &self.entries
    }

    pub fn outcome(&self, plugin_id: &str) -> Option<&LoadOutcome> {
        self.entries
            .iter()
            .find(|e| e.plugin_id == plugin_id)
            .map(|e| &e.outcome)
    }

    pub fn loaded(&self) -> Vec<&str> {
        self.ids_where(|o| matches!(o, LoadOutcome::Loaded))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.ids_where(|o| matches!(o, LoadOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.ids_where(|o| matches!(o, LoadOutcome::Failed(_)))
    }

    fn ids_where(&self, pred: impl Fn(&LoadOutcome) -> bool) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| pred(&e.outcome))
            .map(|e| e.plugin_id.as_str())
            .collect()
    }

    fn record(&mut self, plugin_id: String, result: Result<(), PluginHostError>) {
        let outcome = match result {
            Ok(()) => LoadOutcome::Loaded,
            Err(PluginHostError::PolicyDenied(reason)) => {
                warn!(plugin_id = %plugin_id, "Plugin skipped: {reason}");
                LoadOutcome::Skipped(reason)
            }
            Err(e) => {
                error!(plugin_id = %plugin_id, "Plugin failed to load: {e}");
                LoadOutcome::Failed(e)
            }
        };
        self.entries.push(LoadEntry { plugin_id, outcome });
    }

    fn skip(&mut self, plugin_id: String, reason: String) {
        warn!(plugin_id = %plugin_id, "Plugin skipped: {reason}");
        self.entries.push(LoadEntry {
            plugin_id,
            outcome: LoadOutcome::Skipped(reason),
        });
    }
}

/// Loads extensions and assembles the routes they contribute.
pub struct PluginHost {
    registry: Arc<PageRegistry>,
    store: Arc<dyn RowStore>,
    policy: PluginPolicy,
    builtins: HashMap<String, Arc<dyn Extension>>,
    plugins: IndexMap<String, PluginManifest>,
    claimed: HashSet<String>,
    router: Router,
}

impl PluginHost {
    pub fn new(registry: Arc<PageRegistry>) -> Self {
        Self::with_policy(registry, PluginPolicy::default())
    }

    pub fn with_policy(registry: Arc<PageRegistry>, policy: PluginPolicy) -> Self {
        let store: Arc<dyn RowStore> = Arc::new(registry.store().clone());
        Self {
            registry,
            store,
            policy,
            builtins: HashMap::new(),
            plugins: IndexMap::new(),
            claimed: HashSet::new(),
            router: Router::new(),
        }
    }

    /// Marks `path` as owned by the host so no plugin can register it.
    pub fn reserve_path(&mut self, path: impl Into<String>) {
        self.claimed.insert(path.into());
    }

    /// Makes a compiled-in extension available to `entry.toml` files as
    /// `builtin = "<name>"`.
    pub fn register_builtin(&mut self, name: impl Into<String>, extension: Arc<dyn Extension>) {
        self.builtins.insert(name.into(), extension);
    }

    // ================================================================
    // Loading
    // ================================================================

    /// Runs one extension's `init` inside the fault boundary.
    ///
    /// Routes are merged into the host router only if `init` returns `Ok`.
    /// Pages registered before a failure stay persisted.
    pub fn load_extension(
        &mut self,
        manifest: PluginManifest,
        extension: &dyn Extension,
    ) -> Result<(), PluginHostError> {
        let plugin_id = manifest.id.clone();

        if !self.policy.is_plugin_allowed(&plugin_id) {
            return Err(PluginHostError::PolicyDenied(format!(
                "plugin '{plugin_id}' blocked by policy"
            )));
        }
        if self.plugins.contains_key(&plugin_id) {
            return Err(PluginHostError::PluginAlreadyLoaded(plugin_id));
        }

        debug!(plugin_id = %plugin_id, "Initializing plugin");
        let mut caps = Capabilities::new(
            &plugin_id,
            &self.claimed,
            Arc::clone(&self.store),
            &self.registry,
        );
        match guard::contain(|| extension.init(&mut caps)) {
            Err(message) => {
                return Err(PluginHostError::PluginCrashed {
                    plugin_id: plugin_id.clone(),
                    message,
                });
            }
            Ok(Err(e)) => {
                return Err(PluginHostError::InitializationFailed {
                    plugin_id: plugin_id.clone(),
                    message: format!("{e:#}"),
                });
            }
            Ok(Ok(())) => {}
        }
        let (staged, paths) = caps.into_staged();

        let current = self.router.clone();
        self.router = guard::contain(move || current.merge(staged)).map_err(|message| {
            PluginHostError::PluginCrashed {
                plugin_id: plugin_id.clone(),
                message,
            }
        })?;
        self.claimed.extend(paths.iter().cloned());

        info!(plugin_id = %plugin_id, routes = paths.len(), "Plugin loaded");
        self.plugins.insert(plugin_id, manifest);
        Ok(())
    }

    /// Loads compiled-in extensions in the given order.
    pub fn load_all<I>(&mut self, extensions: I) -> LoadReport
    where
        I: IntoIterator<Item = (PluginManifest, Arc<dyn Extension>)>,
    {
        let mut report = LoadReport::default();
        for (manifest, extension) in extensions {
            let plugin_id = manifest.id.clone();
            let result = self.load_extension(manifest, extension.as_ref());
            report.record(plugin_id, result);
        }
        report
    }

    /// Loads every plugin directory under `root`, in lexicographic order.
    ///
    /// A directory without `plugin.toml` or `entry.toml` is skipped. An
    /// unreadable `root` yields an empty report.
    pub fn discover_and_load(&mut self, root: &Path) -> LoadReport {
        let mut report = LoadReport::default();

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), "Cannot read plugins directory: {e}");
                return report;
            }
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        info!(root = %root.display(), candidates = dirs.len(), "Discovering plugins");
        for dir in dirs {
            self.load_dir(&dir, &mut report);
        }
        report
    }

    fn load_dir(&mut self, dir: &Path, report: &mut LoadReport) {
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for file in [MANIFEST_FILE, ENTRY_FILE] {
            if !dir.join(file).is_file() {
                report.skip(dir_name, format!("missing {file}"));
                return;
            }
        }

        let manifest = match PluginManifest::load(dir) {
            Ok(manifest) => manifest,
            Err(e) => return report.record(dir_name, Err(e)),
        };
        let plugin_id = manifest.id.clone();

        let entry = match EntryModule::load(dir) {
            Ok(entry) => entry,
            Err(e) => return report.record(plugin_id, Err(e)),
        };

        let builtin = match &entry.builtin {
            None => None,
            Some(name) => match self.builtins.get(name) {
                Some(ext) => Some(Arc::clone(ext)),
                None => {
                    let err = PluginHostError::UnknownBuiltin {
                        plugin_id: plugin_id.clone(),
                        builtin: name.clone(),
                    };
                    return report.record(plugin_id, Err(err));
                }
            },
        };

        let extension = DeclarativeExtension { entry, builtin };
        let result = self.load_extension(manifest, &extension);
        report.record(plugin_id, result);
    }

    // ================================================================
    // Queries
    // ================================================================

    pub fn is_loaded(&self, plugin_id: &str) -> bool {
        self.plugins.contains_key(plugin_id)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Manifests of loaded plugins, in load order.
    pub fn list_plugins(&self) -> Vec<&PluginManifest> {
        self.plugins.values().collect()
    }

    pub fn registry(&self) -> &Arc<PageRegistry> {
        &self.registry
    }

    /// Router holding every route contributed by loaded plugins.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Extension built from an `entry.toml`.
struct DeclarativeExtension {
    entry: EntryModule,
    builtin: Option<Arc<dyn Extension>>,
}

impl Extension for DeclarativeExtension {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
        for endpoint in &self.entry.endpoints {
            let body = endpoint.body.clone();
            caps.routes().route(
                &endpoint.path,
                get(move || {
                    let body = body.clone();
                    async move { Json(body) }
                }),
            )?;
        }
        for page in &self.entry.pages {
            caps.register_page(page);
        }
        if let Some(builtin) = &self.builtin {
            builtin.init(caps)?;
        }
        Ok(())
    }
}

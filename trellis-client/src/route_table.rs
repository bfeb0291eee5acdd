//! Named route table and reconciliation against the page registry.

use crate::synthesizer::{Component, Synthesizer};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use trellis_types::{AccessMeta, StoredPage};

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    pub component: Component,
    pub meta: AccessMeta,
    /// Whether path parameters are passed to the component as props.
    pub props: bool,
}

impl RouteDescriptor {
    /// A public route rendering the named shell view.
    pub fn view(path: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            component: Component::view(name.clone()),
            name,
            meta: AccessMeta::PUBLIC,
            props: false,
        }
    }

    #[must_use]
    pub fn with_meta(mut self, meta: AccessMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn with_props(mut self) -> Self {
        self.props = true;
        self
    }

    /// Matches `path` against this route's pattern, returning captured params.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut pattern = segments(&self.path);
        let mut actual = segments(path);
        let mut params = BTreeMap::new();

        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(expected), Some(segment)) => match capture_name(expected) {
                    Some(param) => {
                        params.insert(param.to_string(), segment.to_string());
                    }
                    None if expected == segment => {}
                    None => return None,
                },
                _ => return None,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty())
}

fn capture_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix(':')
        .or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .filter(|name| !name.is_empty())
}

/// A route resolved from a concrete path.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    pub params: BTreeMap<String, String>,
}

/// Routes keyed by name, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    routes: IndexMap<String, RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `route`, replacing any route of the same name in place.
    pub fn insert(&mut self, route: RouteDescriptor) -> Option<RouteDescriptor> {
        self.routes.insert(route.name.clone(), route)
    }

    pub fn get(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    /// First route, in table order, whose pattern matches `path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.values().find_map(|route| {
            route.matches(path).map(|params| RouteMatch { route, params })
        })
    }
}

impl FromIterator<RouteDescriptor> for RouteTable {
    fn from_iter<I: IntoIterator<Item = RouteDescriptor>>(iter: I) -> Self {
        let mut table = Self::new();
        for route in iter {
            table.insert(route);
        }
        table
    }
}

/// The shell's built-in routes.
pub fn default_static_routes() -> RouteTable {
    [
        RouteDescriptor::view("/", "HomePage"),
        RouteDescriptor::view("/posts/:id", "PostDetail").with_props(),
        RouteDescriptor::view("/login", "LoginPage"),
        RouteDescriptor::view("/admin", "AdminDashboard").with_meta(AccessMeta::ADMIN),
        RouteDescriptor::view("/admin/posts/new", "NewPost").with_meta(AccessMeta::ADMIN),
        RouteDescriptor::view("/admin/posts/edit/:id", "EditPost")
            .with_meta(AccessMeta::ADMIN)
            .with_props(),
    ]
    .into_iter()
    .collect()
}

/// Why a page did not make it into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `overridesRouteName` names no static route.
    OverrideTargetMissing(String),
    /// Another route already has this name.
    NameCollision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    pub name: String,
    pub reason: SkipReason,
}

/// Result of merging a registry snapshot into the static routes.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub table: RouteTable,
    /// Static routes whose component and meta were replaced.
    pub overridden: Vec<String>,
    /// Pages added as new routes.
    pub appended: Vec<String>,
    pub skipped: Vec<SkippedPage>,
}

/// Builds a fresh table from `static_routes` and `pages`.
///
/// A page with `overrides_route_name` replaces the named static route's
/// component and access meta, keeping its path and name. An empty override
/// name counts as none. Any other page is appended unless its name is
/// already taken; a duplicate path is appended too and resolves to
/// whichever route comes first.
pub fn reconcile(
    static_routes: &RouteTable,
    pages: &[StoredPage],
    synthesizer: &Synthesizer,
) -> Reconciliation {
    let mut table = static_routes.clone();
    let mut overridden = Vec::new();
    let mut appended = Vec::new();
    let mut skipped = Vec::new();

    for page in pages {
        if let Some(target) = page.overrides_route_name.as_deref().filter(|t| !t.is_empty()) {
            if !static_routes.contains(target) {
                warn!(page = %page.name, override_target = target, "Attempted to override non-existent route");
                skipped.push(SkippedPage {
                    name: page.name.clone(),
                    reason: SkipReason::OverrideTargetMissing(target.to_string()),
                });
                continue;
            }
            let component = synthesizer.synthesize(&page.component_template, &page.component_script);
            if let Some(route) = table.routes.get_mut(target) {
                route.component = component;
                route.meta = page.access();
            }
            info!(page = %page.name, override_target = target, "Overrode route");
            overridden.push(target.to_string());
            continue;
        }

        if table.contains(&page.name) {
            warn!(page = %page.name, "Dynamic page name already routed; skipping");
            skipped.push(SkippedPage {
                name: page.name.clone(),
                reason: SkipReason::NameCollision,
            });
            continue;
        }
        if table.resolve(&page.path).is_some() {
            debug!(page = %page.name, path = %page.path, "Dynamic page path already routed; earlier route wins");
        }

        table.insert(RouteDescriptor {
            path: page.path.clone(),
            name: page.name.clone(),
            component: synthesizer.synthesize(&page.component_template, &page.component_script),
            meta: page.access(),
            props: false,
        });
        appended.push(page.name.clone());
    }

    Reconciliation {
        table,
        overridden,
        appended,
        skipped,
    }
}

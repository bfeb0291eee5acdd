//! Session-scoped router: access guard plus the one-shot dynamic page load.
//!
//! Load state moves `NotLoaded -> Loading -> Loaded` and never back. The
//! first navigation that passes the access guard claims the load; any
//! navigation arriving while it runs is redirected to the default route
//! instead of waiting.

use crate::fetch::RegistrySource;
use crate::route_table::{reconcile, RouteDescriptor, RouteTable};
use crate::synthesizer::Synthesizer;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, error, info, warn};
use trellis_types::Claims;

/// Progress of the dynamic page load for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
}

/// Credentials of the current user, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub claims: Option<Claims>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, claims: Claims) -> Self {
        Self {
            token: Some(token.into()),
            claims: Some(claims),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.claims.as_ref().is_some_and(Claims::is_admin)
    }

    /// Token to fetch the registry with; only admin sessions get one.
    fn admin_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|_| self.is_admin())
    }
}

/// Redirect targets used by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub login_path: String,
    pub default_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            default_path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectCause {
    AuthRequired,
    AdminRequired,
    /// Another navigation is loading dynamic pages.
    LoadInProgress,
}

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Resolved {
        route: RouteDescriptor,
        params: BTreeMap<String, String>,
    },
    Redirect {
        to: String,
        cause: RedirectCause,
    },
    NotFound {
        path: String,
    },
}

impl Navigation {
    pub fn route_name(&self) -> Option<&str> {
        match self {
            Self::Resolved { route, .. } => Some(&route.name),
            _ => None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

struct Shared {
    static_routes: RouteTable,
    table: RwLock<Arc<RouteTable>>,
    state: Mutex<LoadState>,
    session: RwLock<Session>,
    source: Arc<dyn RegistrySource>,
    synthesizer: Synthesizer,
    config: GuardConfig,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn table(&self) -> Arc<RouteTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn session(&self) -> Session {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Marks the load finished however the load task ends.
struct FinishLoad(Arc<Shared>);

impl Drop for FinishLoad {
    fn drop(&mut self) {
        *self.0.state() = LoadState::Loaded;
    }
}

/// Per-session router. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionRouter {
    shared: Arc<Shared>,
}

impl SessionRouter {
    pub fn new(
        static_routes: RouteTable,
        source: Arc<dyn RegistrySource>,
        synthesizer: Synthesizer,
        session: Session,
    ) -> Self {
        Self::with_config(static_routes, source, synthesizer, session, GuardConfig::default())
    }

    pub fn with_config(
        static_routes: RouteTable,
        source: Arc<dyn RegistrySource>,
        synthesizer: Synthesizer,
        session: Session,
        config: GuardConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: RwLock::new(Arc::new(static_routes.clone())),
                static_routes,
                state: Mutex::new(LoadState::NotLoaded),
                session: RwLock::new(session),
                source,
                synthesizer,
                config,
            }),
        }
    }

    pub fn state(&self) -> LoadState {
        *self.shared.state()
    }

    /// Current route table snapshot.
    pub fn routes(&self) -> Arc<RouteTable> {
        self.shared.table()
    }

    pub fn session(&self) -> Session {
        self.shared.session()
    }

    /// Replaces the session used by the access guard. Load state is kept.
    pub fn set_session(&self, session: Session) {
        *self.shared.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Navigates to `path`.
    ///
    /// The first navigation to pass the access guard triggers the dynamic
    /// page load, waits for it, then resolves `path` again against the new
    /// table. The load runs as its own task and is not cancelled if this
    /// future is dropped.
    pub async fn navigate(&self, path: &str) -> Navigation {
        if let Some(redirect) = self.guard(path) {
            return redirect;
        }

        let claimed = {
            let mut state = self.shared.state();
            match *state {
                LoadState::Loaded => false,
                LoadState::Loading => {
                    debug!(path, "Dynamic pages loading; redirecting");
                    return self.redirect_default(RedirectCause::LoadInProgress);
                }
                LoadState::NotLoaded => {
                    if self.shared.session().admin_token().is_some() {
                        *state = LoadState::Loading;
                        true
                    } else {
                        debug!("Session is not admin; no dynamic pages to load");
                        *state = LoadState::Loaded;
                        false
                    }
                }
            }
        };

        if claimed {
            let shared = Arc::clone(&self.shared);
            if let Err(e) = tokio::spawn(load_dynamic_pages(shared)).await {
                error!("Dynamic page load task failed: {e}");
            }
            if let Some(redirect) = self.guard(path) {
                return redirect;
            }
        }

        self.resolve(path)
    }

    /// Access checks against the route `path` currently resolves to.
    fn guard(&self, path: &str) -> Option<Navigation> {
        let table = self.shared.table();
        let meta = table.resolve(path)?.route.meta;
        let session = self.shared.session();

        if meta.requires_auth && !session.is_authenticated() {
            return Some(Navigation::Redirect {
                to: self.shared.config.login_path.clone(),
                cause: RedirectCause::AuthRequired,
            });
        }
        if meta.requires_admin && !session.is_admin() {
            return Some(self.redirect_default(RedirectCause::AdminRequired));
        }
        None
    }

    fn resolve(&self, path: &str) -> Navigation {
        let table = self.shared.table();
        match table.resolve(path) {
            Some(m) => Navigation::Resolved {
                route: m.route.clone(),
                params: m.params,
            },
            None => Navigation::NotFound {
                path: path.to_string(),
            },
        }
    }

    fn redirect_default(&self, cause: RedirectCause) -> Navigation {
        Navigation::Redirect {
            to: self.shared.config.default_path.clone(),
            cause,
        }
    }
}

async fn load_dynamic_pages(shared: Arc<Shared>) {
    let _finish = FinishLoad(Arc::clone(&shared));

    let session = shared.session();
    let Some(token) = session.admin_token() else {
        return;
    };

    match shared.source.fetch_pages(token).await {
        Ok(pages) => {
            let merged = reconcile(&shared.static_routes, &pages, &shared.synthesizer);
            info!(
                overridden = merged.overridden.len(),
                appended = merged.appended.len(),
                skipped = merged.skipped.len(),
                "Dynamic pages merged"
            );
            *shared.table.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(merged.table);
        }
        Err(e) => warn!("Error fetching dynamic pages: {e}"),
    }
}

//! Client runtime for Trellis.
//!
//! # Architecture
//!
//! - `Synthesizer` turns a stored `(template, script)` pair into a
//!   `Component`, containing every evaluation failure in a fixed fallback
//! - `reconcile` merges a registry snapshot into the static `RouteTable`,
//!   overriding named routes in place and appending the rest
//! - `SessionRouter` guards navigation by access meta and runs the one-shot
//!   registry load, swapping in the merged table as a whole
//! - `HttpRegistryClient` fetches the snapshot from the host

mod error;
mod fetch;
mod route_table;
mod session;
mod synthesizer;
mod template;

pub use error::{EvaluationError, FetchError, RenderError};
pub use fetch::{HttpRegistryClient, RegistrySource, DEFAULT_TIMEOUT, REGISTRY_PATH};
pub use route_table::{
    default_static_routes, reconcile, Reconciliation, RouteDescriptor, RouteMatch, RouteTable,
    SkipReason, SkippedPage,
};
pub use session::{GuardConfig, LoadState, Navigation, RedirectCause, Session, SessionRouter};
pub use synthesizer::{
    Component, ComponentBuilder, ComponentDefinition, DynamicComponent, Synthesizer,
    LOAD_FAILURE_MARKUP, RENDER_FAILURE_MARKUP,
};

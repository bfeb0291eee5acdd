//! Extensions compiled into the server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;
use trellis_plugin_host::{Capabilities, Extension, PluginManifest};
use trellis_storage::RowStore;
use trellis_types::PageDefinition;

pub const HELLO_PLUGIN_ID: &str = "hello-plugin";

/// Name under which [`HelloExtension`] is offered to `entry.toml` files.
pub const HELLO_BUILTIN: &str = "hello";

/// Demonstrates every capability: two API routes, a database query through
/// the persistence handle, one new page and one override of `HomePage`.
pub struct HelloExtension;

impl HelloExtension {
    pub fn manifest() -> PluginManifest {
        let mut manifest = PluginManifest::new(HELLO_PLUGIN_ID, "Hello Plugin");
        manifest.description = "Example extension bundled with the server".to_string();
        manifest
    }

    /// Page served at `/plugin-page`.
    pub fn plugin_page() -> PageDefinition {
        PageDefinition::new(
            "/plugin-page",
            "PluginPage",
            "<div><h1>Hello from Plugin Page!</h1><p>{{ message }}</p></div>",
            json!({
                "default": {
                    "name": "PluginPageComponent",
                    "data": { "message": "This page was registered by a plugin." },
                    "render": "<div><h1>Hello from Plugin Page!</h1><p>{{ message }}</p></div>"
                }
            })
            .to_string(),
        )
    }

    /// Replaces the shell's home page.
    pub fn overridden_home() -> PageDefinition {
        PageDefinition::new(
            "/home-plugin",
            "OverriddenHomePage",
            "<div><h1>Hello from Plugin-Overridden Home Page!</h1></div>",
            json!({ "default": { "name": "OverriddenHomePageComponent" } }).to_string(),
        )
        .overriding("HomePage")
    }
}

impl Extension for HelloExtension {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
        caps.routes().route(
            "/api/hello-plugin",
            get(|| async { Json(json!({ "message": "Hello from Trellis plugin!" })) }),
        )?;

        let store = caps.store();
        caps.routes().route(
            "/api/plugin-db-test",
            get(move || page_count(Arc::clone(&store))),
        )?;

        caps.register_page(&Self::plugin_page());
        caps.register_page(&Self::overridden_home());
        Ok(())
    }
}

async fn page_count(store: Arc<dyn RowStore>) -> Response {
    let result = tokio::task::spawn_blocking(move || {
        store.get("SELECT COUNT(*) AS count FROM pages", &[])
    })
    .await;

    match result {
        Ok(Ok(row)) => {
            let count = row
                .and_then(|mut row| row.remove("count"))
                .unwrap_or(Value::from(0));
            Json(json!({
                "message": "Database connection successful",
                "data": { "count": count }
            }))
            .into_response()
        }
        Ok(Err(e)) => {
            error!(plugin_id = HELLO_PLUGIN_ID, "Database query failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e) => {
            error!(plugin_id = HELLO_PLUGIN_ID, "Database query task failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "query failed" }))).into_response()
        }
    }
}

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use trellis_plugin_host::{
    Capabilities, Extension, LoadOutcome, PluginHost, PluginHostError, PluginManifest,
};
use trellis_storage::{PageRegistry, SqliteStore};
use trellis_types::PageDefinition;

// ── Test extensions ──────────────────────────────────────────────

/// Registers `GET <path>` answering `{"plugin": <id>}`.
struct Greeter {
    path: &'static str,
}

impl Extension for Greeter {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
        let id = caps.plugin_id().to_string();
        caps.routes().route(
            self.path,
            get(move || {
                let id = id.clone();
                async move { Json(json!({ "plugin": id })) }
            }),
        )?;
        Ok(())
    }
}

/// Registers a route and a page, then panics.
struct Panicker;

impl Extension for Panicker {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
        caps.routes().route("/panicker", get(|| async { "never served" }))?;
        caps.register_page(&PageDefinition::new("/panic-page", "PanicPage", "<p></p>", "{}"));
        panic!("extension blew up");
    }
}

/// Registers a route, then returns an error.
struct Failer;

impl Extension for Failer {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
        caps.routes().route("/failer", get(|| async { "never served" }))?;
        anyhow::bail!("missing configuration")
    }
}

/// Counts pages through the persistence handle.
struct Counter;

impl Extension for Counter {
    fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
        let store = caps.store();
        caps.routes().route(
            "/count",
            get(move || {
                let store = Arc::clone(&store);
                async move {
                    let row = store
                        .get("SELECT COUNT(*) AS count FROM pages", &[])
                        .ok()
                        .flatten()
                        .unwrap_or_default();
                    Json(Value::Object(row))
                }
            }),
        )?;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn make_host() -> PluginHost {
    let registry = PageRegistry::open(SqliteStore::open_in_memory().unwrap()).unwrap();
    PluginHost::new(Arc::new(registry))
}

fn ext(e: impl Extension + 'static) -> Arc<dyn Extension> {
    Arc::new(e)
}

/// Serve `app` on an OS-assigned port, returning the base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

fn write_plugin(root: &Path, dir: &str, manifest: Option<&str>, entry: Option<&str>) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    if let Some(manifest) = manifest {
        fs::write(path.join("plugin.toml"), manifest).unwrap();
    }
    if let Some(entry) = entry {
        fs::write(path.join("entry.toml"), entry).unwrap();
    }
}

// ── Fault isolation ──────────────────────────────────────────────

#[tokio::test]
async fn failing_plugins_leave_no_routes_and_later_plugins_load() {
    let mut host = make_host();
    let report = host.load_all([
        (PluginManifest::new("first", "First"), ext(Greeter { path: "/first" })),
        (PluginManifest::new("panicker", "Panicker"), ext(Panicker)),
        (PluginManifest::new("failer", "Failer"), ext(Failer)),
        (PluginManifest::new("last", "Last"), ext(Greeter { path: "/last" })),
    ]);

    assert_eq!(report.loaded(), vec!["first", "last"]);
    assert_eq!(report.failed(), vec!["panicker", "failer"]);
    assert!(matches!(
        report.outcome("panicker"),
        Some(LoadOutcome::Failed(PluginHostError::PluginCrashed { message, .. }))
            if message == "extension blew up"
    ));
    assert!(matches!(
        report.outcome("failer"),
        Some(LoadOutcome::Failed(PluginHostError::InitializationFailed { message, .. }))
            if message.contains("missing configuration")
    ));

    let base = spawn_server(host.router()).await;
    let body: Value = reqwest::get(format!("{base}/last")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "plugin": "last" }));
    for gone in ["/panicker", "/failer"] {
        let status = reqwest::get(format!("{base}{gone}")).await.unwrap().status();
        assert_eq!(status, 404, "{gone} should not be routed");
    }
}

#[test]
fn pages_registered_before_a_crash_stay_persisted() {
    let mut host = make_host();
    let err = host
        .load_extension(PluginManifest::new("panicker", "Panicker"), &Panicker)
        .unwrap_err();
    assert!(matches!(err, PluginHostError::PluginCrashed { .. }));

    let pages = host.registry().list_pages().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].name, "PanicPage");
}

#[test]
fn router_level_panic_is_contained() {
    struct OldSyntax;
    impl Extension for OldSyntax {
        fn init(&self, caps: &mut Capabilities<'_>) -> anyhow::Result<()> {
            // Colon captures are rejected by the router with a panic.
            caps.routes().route("/items/:id", get(|| async { "x" }))?;
            Ok(())
        }
    }

    let mut host = make_host();
    let err = host
        .load_extension(PluginManifest::new("old", "Old"), &OldSyntax)
        .unwrap_err();
    assert!(matches!(err, PluginHostError::PluginCrashed { .. }));
    assert!(!host.is_loaded("old"));
}

// ── Route conflicts ──────────────────────────────────────────────

#[test]
fn reserved_and_claimed_paths_are_refused() {
    let mut host = make_host();
    host.reserve_path("/admin/dynamic-pages");

    host.load_extension(PluginManifest::new("a", "A"), &Greeter { path: "/shared" })
        .unwrap();

    let err = host
        .load_extension(PluginManifest::new("b", "B"), &Greeter { path: "/shared" })
        .unwrap_err();
    assert!(err.to_string().contains("route conflict"), "{err}");

    let err = host
        .load_extension(
            PluginManifest::new("c", "C"),
            &Greeter {
                path: "/admin/dynamic-pages",
            },
        )
        .unwrap_err();
    assert!(err.to_string().contains("route conflict"), "{err}");

    let err = host
        .load_extension(PluginManifest::new("d", "D"), &Greeter { path: "relative" })
        .unwrap_err();
    assert!(err.to_string().contains("must start with '/'"), "{err}");

    assert_eq!(host.plugin_count(), 1);
}

#[tokio::test]
async fn persistence_handle_reaches_the_page_table() {
    let mut host = make_host();
    host.registry()
        .register_page(&PageDefinition::new("/p", "P", "<p></p>", "{}"))
        .unwrap();
    host.load_extension(PluginManifest::new("counter", "Counter"), &Counter)
        .unwrap();

    let base = spawn_server(host.into_router()).await;
    let body: Value = reqwest::get(format!("{base}/count")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "count": 1 }));
}

// ── Directory discovery ──────────────────────────────────────────

#[tokio::test]
async fn discovery_loads_in_lexicographic_order_and_isolates_failures() {
    let root = tempfile::tempdir().unwrap();
    let root = root.path();

    write_plugin(
        root,
        "d-declarative",
        Some(r#"name = "Declarative""#),
        Some(
            r#"
[[pages]]
path = "/gallery"
name = "Gallery"
componentTemplate = "<div>Gallery</div>"
componentScript = '{"data": {}}'

[[endpoints]]
path = "/api/gallery"
body = { items = 3 }
"#,
        ),
    );
    write_plugin(root, "a-no-entry", Some(r#"name = "No entry""#), None);
    write_plugin(root, "b-bad-manifest", Some("name = [unclosed"), Some(""));
    write_plugin(root, "c-unknown-builtin", Some(""), Some(r#"builtin = "nope""#));
    write_plugin(root, "e-builtin", Some(r#"id = "greeter""#), Some(r#"builtin = "greeter""#));
    write_plugin(root, "f-no-manifest", None, Some(""));
    fs::write(root.join("stray-file.txt"), "ignored").unwrap();

    let mut host = make_host();
    host.register_builtin("greeter", ext(Greeter { path: "/greet" }));
    let report = host.discover_and_load(root);

    let order: Vec<&str> = report.entries().iter().map(|e| e.plugin_id.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "a-no-entry",
            "b-bad-manifest",
            "c-unknown-builtin",
            "d-declarative",
            "greeter",
            "f-no-manifest",
        ]
    );
    assert_eq!(report.skipped(), vec!["a-no-entry", "f-no-manifest"]);
    assert_eq!(report.failed(), vec!["b-bad-manifest", "c-unknown-builtin"]);
    assert_eq!(report.loaded(), vec!["d-declarative", "greeter"]);
    assert!(matches!(
        report.outcome("c-unknown-builtin"),
        Some(LoadOutcome::Failed(PluginHostError::UnknownBuiltin { .. }))
    ));

    let pages = host.registry().list_pages().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].path, "/gallery");

    let base = spawn_server(host.router()).await;
    let body: Value = reqwest::get(format!("{base}/api/gallery")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "items": 3 }));
    let body: Value = reqwest::get(format!("{base}/greet")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "plugin": "greeter" }));
}

#[test]
fn missing_plugins_root_yields_empty_report() {
    let mut host = make_host();
    let report = host.discover_and_load(Path::new("/definitely/not/here"));
    assert!(report.entries().is_empty());
    assert_eq!(host.plugin_count(), 0);
}

#[test]
fn invalid_declared_page_does_not_fail_the_plugin() {
    let root = tempfile::tempdir().unwrap();
    write_plugin(
        root.path(),
        "blank",
        Some(""),
        Some(
            r#"
[[pages]]
path = "/blank"
name = "Blank"
componentTemplate = ""
componentScript = "{}"
"#,
        ),
    );

    let mut host = make_host();
    let report = host.discover_and_load(root.path());
    assert_eq!(report.loaded(), vec!["blank"]);
    assert!(host.registry().list_pages().unwrap().is_empty());
}

use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use trellis_auth::TokenSigner;
use trellis_server::{build_router, AppState, REGISTRY_PATH};
use trellis_storage::{PageRegistry, SqliteStore};
use trellis_types::{Claims, Envelope, PageDefinition, Role, StoredPage};

const SEED: [u8; 32] = [7; 32];

fn signer() -> TokenSigner {
    TokenSigner::from_seed(&SEED)
}

fn registry() -> Arc<PageRegistry> {
    Arc::new(PageRegistry::open(SqliteStore::open_in_memory().unwrap()).unwrap())
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_server(registry: Arc<PageRegistry>) -> String {
    let state = AppState {
        registry,
        verifier: Arc::new(signer().verifier()),
    };
    let app = build_router(state, Router::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn token(role: Role) -> String {
    signer().issue(&Claims::new(1, "tester", role), None).unwrap()
}

async fn get(base: &str, auth: Option<&str>) -> (u16, Value) {
    let client = reqwest::Client::new();
    let mut request = client.get(format!("{base}{REGISTRY_PATH}"));
    if let Some(auth) = auth {
        request = request.header("authorization", auth);
    }
    let resp = request.send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn missing_credential_is_401() {
    let base = spawn_server(registry()).await;

    let (status, body) = get(&base, None).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({ "message": "Missing bearer token" }));

    let (status, _) = get(&base, Some("Bearer ")).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn invalid_credential_is_403() {
    let base = spawn_server(registry()).await;

    for auth in ["Bearer not-a-token", "Basic dXNlcjpwYXNz"] {
        let (status, body) = get(&base, Some(auth)).await;
        assert_eq!(status, 403);
        assert_eq!(body, json!({ "message": "Invalid token" }));
    }

    let foreign = TokenSigner::from_seed(&[9; 32])
        .issue(&Claims::new(1, "admin", Role::Admin), None)
        .unwrap();
    let (status, _) = get(&base, Some(&format!("Bearer {foreign}"))).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn expired_credential_is_403() {
    let base = spawn_server(registry()).await;
    let expired = signer()
        .issue(&Claims::new(1, "admin", Role::Admin), Some(chrono::Duration::minutes(-5)))
        .unwrap();
    let (status, _) = get(&base, Some(&format!("Bearer {expired}"))).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn non_admin_is_403() {
    let base = spawn_server(registry()).await;
    let (status, body) = get(&base, Some(&format!("Bearer {}", token(Role::User)))).await;
    assert_eq!(status, 403);
    assert_eq!(body, json!({ "message": "Forbidden: Admin access required" }));
}

#[tokio::test]
async fn admin_receives_snapshot_in_id_order() {
    let registry = registry();
    registry
        .register_page(&PageDefinition::new("/b", "B", "<p>b</p>", "{}"))
        .unwrap();
    registry
        .register_page(&PageDefinition::new("/a", "A", "<p>a</p>", "{}").overriding("HomePage"))
        .unwrap();
    let base = spawn_server(registry).await;

    let (status, body) = get(&base, Some(&format!("Bearer {}", token(Role::Admin)))).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "success");

    let envelope: Envelope<Vec<StoredPage>> = serde_json::from_value(body).unwrap();
    let names: Vec<&str> = envelope.data.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A"]);
    assert_eq!(envelope.data[1].overrides_route_name.as_deref(), Some("HomePage"));
}

#[tokio::test]
async fn store_failure_is_400_with_error() {
    let registry = registry();
    registry.store().execute_batch("DROP TABLE pages").unwrap();
    let base = spawn_server(registry).await;

    let (status, body) = get(&base, Some(&format!("Bearer {}", token(Role::Admin)))).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("pages"));
}

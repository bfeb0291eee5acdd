//! HTTP host for Trellis.
//!
//! Serves the page registry to admin clients and every route contributed by
//! extensions loaded at boot.

pub mod boot;
pub mod builtin;
pub mod config;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};
use trellis_auth::{bearer_token, CredentialVerifier};
use trellis_storage::PageRegistry;
use trellis_types::Envelope;

/// Path of the registry read endpoint.
pub const REGISTRY_PATH: &str = "/admin/dynamic-pages";

/// Shared state of the host's own endpoints.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PageRegistry>,
    pub verifier: Arc<dyn CredentialVerifier>,
}

/// Builds the host router: the registry endpoint plus `plugins`.
pub fn build_router(state: AppState, plugins: Router) -> Router {
    Router::new()
        .route(REGISTRY_PATH, get(list_dynamic_pages))
        .with_state(state)
        .merge(plugins)
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn list_dynamic_pages(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Ok(header) = headers.get(AUTHORIZATION).map(|v| v.to_str()).transpose() else {
        return message(StatusCode::FORBIDDEN, "Invalid token");
    };

    let claims = match bearer_token(header).and_then(|token| state.verifier.verify(token)) {
        Ok(claims) => claims,
        Err(e) if e.is_missing() => return message(StatusCode::UNAUTHORIZED, "Missing bearer token"),
        Err(e) => {
            debug!("Rejected registry credential: {e}");
            return message(StatusCode::FORBIDDEN, "Invalid token");
        }
    };
    if !claims.is_admin() {
        debug!(user = %claims.username, "Non-admin registry request");
        return message(StatusCode::FORBIDDEN, "Forbidden: Admin access required");
    }

    let registry = Arc::clone(&state.registry);
    match tokio::task::spawn_blocking(move || registry.list_pages()).await {
        Ok(Ok(pages)) => Json(Envelope::success(pages)).into_response(),
        Ok(Err(e)) => {
            error!("Failed to list dynamic pages: {e}");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e) => {
            error!("Registry listing task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "registry listing failed" })),
            )
                .into_response()
        }
    }
}

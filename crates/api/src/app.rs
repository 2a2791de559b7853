//! Axum router and handlers (public entrypoint used by `main.rs` and tests).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use aisle_auth::Permission;
use aisle_authz::AuthorizationEngine;
use aisle_core::{SubjectId, VendorId};
use aisle_sync::{Freshness, SyncError};

use crate::middleware;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthorizationEngine>,
}

/// Build the full HTTP router.
pub fn build_app(engine: Arc<AuthorizationEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/authorize", post(authorize))
        .route("/v1/subjects/:subject_id/force-sync", post(force_sync))
        .with_state(AppState { engine })
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

// ─────────────────────────────────────────────────────────────────────────────
// POST /v1/authorize
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AuthorizeRequest {
    resource_id: String,
    action: String,
}

/// Authoritative permission decision for the bearer of the token.
///
/// Always answers 200 with a structured decision (allow or deny with a
/// reason); transport-level errors are reserved for malformed requests.
async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AuthorizeRequest>,
) -> axum::response::Response {
    let token = match middleware::extract_bearer(&headers) {
        Ok(token) => token,
        Err(status) => return json_error(status, "missing_bearer", "bearer token required"),
    };

    let resource_id: VendorId = match request.resource_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "invalid_resource_id",
                "resource_id must be a UUID",
            );
        }
    };

    let action = Permission::new(request.action);
    let decision = state.engine.authorize(token, resource_id, &action).await;

    (StatusCode::OK, Json(decision)).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// POST /v1/subjects/:subject_id/force-sync
// ─────────────────────────────────────────────────────────────────────────────

/// Administrative invalidate-then-refresh trigger. Expected to be mounted
/// behind the host application's operator-only surface.
async fn force_sync(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> axum::response::Response {
    let subject_id = match SubjectId::new(subject_id) {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_subject_id", e.to_string()),
    };

    match state.engine.force_sync(&subject_id).await {
        Ok(synced) => (
            StatusCode::OK,
            Json(json!({
                "subject_id": subject_id,
                "fetched_at": synced.entry.fetched_at,
                "degraded": synced.freshness == Freshness::Degraded,
            })),
        )
            .into_response(),
        Err(SyncError::StaleAndUnreachable) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "provider_unreachable",
            "identity provider unreachable and no cached entry",
        ),
    }
}

fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

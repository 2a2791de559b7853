//! Black-box tests: spawn the real router on an ephemeral port and drive it
//! over HTTP with provider doubles behind the engine.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use aisle_auth::{JwtVerifier, OrganizationMembership, Permission, Role, SubjectSnapshot};
use aisle_authz::{AuthorizationEngine, EngineConfig, InMemoryResourceDirectory};
use aisle_core::{OrganizationId, SubjectId, VendorId};
use aisle_idp::StaticProvider;
use aisle_sync::{PermissionCache, SyncOrchestrator};

const SECRET: &str = "test-secret";
const ISSUER: &str = "https://aisle.test.auth0.com/";
const AUDIENCE: &str = "https://api.aisle.app";

struct TestServer {
    base_url: String,
    provider: Arc<StaticProvider>,
    directory: Arc<InMemoryResourceDirectory>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let provider = Arc::new(StaticProvider::new());
        let cache = Arc::new(PermissionCache::with_default_ttl());
        let orchestrator = Arc::new(SyncOrchestrator::new(cache, provider.clone()));
        let directory = Arc::new(InMemoryResourceDirectory::new());
        let verifier = Arc::new(JwtVerifier::hs256(SECRET.as_bytes(), ISSUER, AUDIENCE));

        let engine = Arc::new(AuthorizationEngine::new(
            verifier,
            orchestrator,
            directory.clone(),
            EngineConfig::default(),
        ));

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = aisle_api::app::build_app(engine);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            provider,
            directory,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn subject() -> SubjectId {
    SubjectId::new("auth0|u1").unwrap()
}

fn org(id: &str) -> OrganizationId {
    OrganizationId::new(id).unwrap()
}

fn mint_jwt() -> String {
    let now = Utc::now();
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": "auth0|u1",
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": (now + ChronoDuration::minutes(10)).timestamp(),
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn vendor_snapshot(org_id: &str) -> SubjectSnapshot {
    SubjectSnapshot::assemble(
        subject(),
        vec![Role::new("Vendor Owner")],
        Vec::new(),
        vec![OrganizationMembership {
            organization_id: org(org_id),
            roles: vec![Role::new("Vendor Owner")],
            permissions: vec![Permission::new("edit:vendor_info")],
        }],
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn authorize_grants_and_denies_by_organization() {
    let server = TestServer::spawn().await;
    server.provider.set_snapshot(vendor_snapshot("org_w42"));

    let own_vendor = VendorId::new();
    let foreign_vendor = VendorId::new();
    server.directory.insert(own_vendor, Some(org("org_w42")));
    server.directory.insert(foreign_vendor, Some(org("org_w43")));

    let client = reqwest::Client::new();
    let token = mint_jwt();

    let response = client
        .post(format!("{}/v1/authorize", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "resource_id": own_vendor.to_string(), "action": "edit:vendor_info" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["reason"], "GRANTED");

    let response = client
        .post(format!("{}/v1/authorize", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "resource_id": foreign_vendor.to_string(), "action": "edit:vendor_info" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "NO_ORG_MEMBERSHIP");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn authorize_without_bearer_is_unauthorized() {
    let server = TestServer::spawn().await;

    let response = reqwest::Client::new()
        .post(format!("{}/v1/authorize", server.base_url))
        .json(&json!({ "resource_id": VendorId::new().to_string(), "action": "view:vendors" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn authorize_with_invalid_token_is_a_structured_denial() {
    let server = TestServer::spawn().await;

    let response = reqwest::Client::new()
        .post(format!("{}/v1/authorize", server.base_url))
        .bearer_auth("not-a-jwt")
        .json(&json!({ "resource_id": VendorId::new().to_string(), "action": "view:vendors" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "TOKEN_INVALID");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn force_sync_round_trip() {
    let server = TestServer::spawn().await;
    server.provider.set_snapshot(vendor_snapshot("org_w42"));

    let response = reqwest::Client::new()
        .post(format!(
            "{}/v1/subjects/{}/force-sync",
            server.base_url, "auth0|u1"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["subject_id"], "auth0|u1");
    assert_eq!(body["degraded"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_endpoint() {
    let server = TestServer::spawn().await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

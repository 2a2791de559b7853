//! HTTP client for the identity provider's management API.
//!
//! Authenticates with service credentials (client-credentials grant), reuses
//! the management token until shortly before expiry, and performs one logical
//! fetch of a subject's roles and permissions. Role/permission rows may carry
//! an `organization_id`; rows without one are platform-level grants.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use aisle_auth::{OrganizationMembership, Permission, Role, SubjectSnapshot};
use aisle_core::{OrganizationId, SubjectId};

use crate::provider::{IdentityProvider, ProviderError};

/// Reuse the management token until this close to its expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Connection settings for the provider's management API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider base URL, e.g. `https://aisle.eu.auth0.com`.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Hard per-request timeout; exceeding it classifies as `Unavailable`.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Management-API client. The only component performing network calls.
pub struct HttpIdentityProvider {
    base_url: Url,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl HttpIdentityProvider {
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            client,
            token: Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Unavailable("base url cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    /// Acquire (or reuse) a management-API token via the client-credentials
    /// grant. Credential failures are classified as `Unavailable`: they say
    /// nothing authoritative about the subject being fetched.
    async fn management_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            let margin = chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
            if Utc::now() + margin < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        // Management audience carries a trailing slash by provider convention.
        let mut audience_url = self.base_url.clone();
        audience_url.set_path("/api/v2/");
        let audience = audience_url.to_string();

        let request = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            audience,
        };

        let response = self
            .client
            .post(self.endpoint(&["oauth", "token"])?)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "management token request failed");
            return Err(ProviderError::Unavailable(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("token response: {e}")))?;

        let token = body.access_token.clone();
        *guard = Some(CachedToken {
            token: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        });

        Ok(token)
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        subject_id: &SubjectId,
        tail: &str,
    ) -> Result<Vec<T>, ProviderError> {
        let url = self.endpoint(&["api", "v2", "users", subject_id.as_str(), tail])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Rejected(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn fetch(&self, subject_id: &SubjectId) -> Result<SubjectSnapshot, ProviderError> {
        let token = self.management_token().await?;

        let roles: Vec<RoleRow> = self.get_rows(&token, subject_id, "roles").await?;
        let permissions: Vec<PermissionRow> =
            self.get_rows(&token, subject_id, "permissions").await?;

        tracing::debug!(
            subject = %subject_id,
            roles = roles.len(),
            permissions = permissions.len(),
            "fetched subject from identity provider"
        );

        assemble_snapshot(subject_id.clone(), roles, permissions)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    name: String,
    #[serde(default)]
    organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermissionRow {
    permission_name: String,
    #[serde(default)]
    organization_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Classification & assembly
// ─────────────────────────────────────────────────────────────────────────────

fn classify_transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Unavailable(err.to_string())
}

fn classify_status(status: StatusCode) -> ProviderError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::Unavailable(format!("provider returned {status}"))
    } else {
        ProviderError::Rejected(format!("provider returned {status}"))
    }
}

/// Group org-scoped rows into memberships; rows without an organization id
/// are platform-level grants.
fn assemble_snapshot(
    subject_id: SubjectId,
    roles: Vec<RoleRow>,
    permissions: Vec<PermissionRow>,
) -> Result<SubjectSnapshot, ProviderError> {
    let mut global_roles = Vec::new();
    let mut platform_permissions = Vec::new();
    let mut memberships: Vec<OrganizationMembership> = Vec::new();

    let mut membership_for = |org: OrganizationId,
                              memberships: &mut Vec<OrganizationMembership>|
     -> usize {
        match memberships.iter().position(|m| m.organization_id == org) {
            Some(i) => i,
            None => {
                memberships.push(OrganizationMembership {
                    organization_id: org,
                    roles: Vec::new(),
                    permissions: Vec::new(),
                });
                memberships.len() - 1
            }
        }
    };

    for row in roles {
        match row.organization_id {
            Some(raw) => {
                let org = OrganizationId::new(raw)
                    .map_err(|e| ProviderError::Rejected(format!("malformed response: {e}")))?;
                let i = membership_for(org, &mut memberships);
                memberships[i].roles.push(Role::new(row.name));
            }
            None => global_roles.push(Role::new(row.name)),
        }
    }

    for row in permissions {
        match row.organization_id {
            Some(raw) => {
                let org = OrganizationId::new(raw)
                    .map_err(|e| ProviderError::Rejected(format!("malformed response: {e}")))?;
                let i = membership_for(org, &mut memberships);
                memberships[i]
                    .permissions
                    .push(Permission::new(row.permission_name));
            }
            None => platform_permissions.push(Permission::new(row.permission_name)),
        }
    }

    Ok(SubjectSnapshot::assemble(
        subject_id,
        global_roles,
        platform_permissions,
        memberships,
    ))
}

//! Authorization engine: verify → ensure fresh → scope → decide.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use aisle_auth::{Permission, Resource, ScopeOrigin, TokenVerifier, registry, scope};
use aisle_core::{SubjectId, VendorId};
use aisle_sync::{Freshness, RefreshReason, SyncError, SyncOrchestrator, SyncedEntry};

use crate::decision::{AuthorizationDecision, DecisionReason};
use crate::directory::ResourceDirectory;

/// Engine policy knobs.
#[derive(Clone)]
pub struct EngineConfig {
    /// Actions denied under a degraded (stale-served) snapshot even when the
    /// stale data would allow them. Bounds the blast radius of trusting
    /// stale permissions.
    pub high_risk_actions: HashSet<Permission>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            high_risk_actions: [registry::MANAGE_PAYMENTS, registry::VIEW_PAYMENTS]
                .into_iter()
                .collect(),
        }
    }
}

/// The public entry point of the authorization core.
///
/// Owns decision objects; the sync orchestrator it wraps is the exclusive
/// writer of the permission cache.
pub struct AuthorizationEngine {
    verifier: Arc<dyn TokenVerifier>,
    orchestrator: Arc<SyncOrchestrator>,
    directory: Arc<dyn ResourceDirectory>,
    config: EngineConfig,
}

impl AuthorizationEngine {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        orchestrator: Arc<SyncOrchestrator>,
        directory: Arc<dyn ResourceDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            verifier,
            orchestrator,
            directory,
            config,
        }
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// Authoritative permission decision for (token, resource, action).
    ///
    /// Every failure mode resolves to a deny with a structured reason;
    /// there is no code path that fails open.
    pub async fn authorize(
        &self,
        token: &str,
        resource_id: VendorId,
        action: &Permission,
    ) -> AuthorizationDecision {
        let identity = match self.verifier.verify(token, Utc::now()) {
            Ok(identity) => identity,
            Err(err) => {
                tracing::debug!(%err, "token rejected");
                return AuthorizationDecision::denied(DecisionReason::TokenInvalid);
            }
        };

        let synced = match self
            .orchestrator
            .ensure_fresh(&identity.subject_id, RefreshReason::Stale)
            .await
        {
            Ok(synced) => synced,
            Err(SyncError::StaleAndUnreachable) => {
                return AuthorizationDecision::denied(DecisionReason::StaleAndUnreachable);
            }
        };

        let owning_organization_id = match self.directory.owning_organization(&resource_id).await {
            Ok(owning) => owning,
            Err(err) => {
                // Unknown or unreachable resource: indeterminate, deny.
                tracing::warn!(resource = %resource_id, %err, "resource lookup failed");
                return AuthorizationDecision::denied(DecisionReason::MissingPermission);
            }
        };

        let resource = Resource {
            resource_id,
            owning_organization_id,
        };
        let effective = scope(&synced.entry.snapshot, &resource);

        if effective.allows(action) {
            if synced.freshness == Freshness::Degraded
                && self.config.high_risk_actions.contains(action)
            {
                tracing::warn!(
                    subject = %identity.subject_id,
                    resource = %resource.resource_id,
                    %action,
                    "downgrading high-risk grant under degraded snapshot"
                );
                return AuthorizationDecision::denied(DecisionReason::MissingPermission);
            }
            return AuthorizationDecision::granted();
        }

        match effective.origin() {
            ScopeOrigin::NoMembership => {
                AuthorizationDecision::denied(DecisionReason::NoOrgMembership)
            }
            _ => AuthorizationDecision::denied(DecisionReason::MissingPermission),
        }
    }

    /// Administrative invalidate-then-refresh for one subject.
    pub async fn force_sync(&self, subject_id: &SubjectId) -> Result<SyncedEntry, SyncError> {
        self.orchestrator
            .ensure_fresh(subject_id, RefreshReason::ForceSync)
            .await
    }

    /// Login-time synchronous refresh; never serves stale.
    pub async fn sync_on_login(&self, subject_id: &SubjectId) -> Result<SyncedEntry, SyncError> {
        self.orchestrator
            .ensure_fresh(subject_id, RefreshReason::Login)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde_json::json;

    use aisle_auth::{
        JwtVerifier, OrganizationMembership, Role, SubjectSnapshot,
    };
    use aisle_core::OrganizationId;
    use aisle_idp::{ProviderError, StaticProvider};
    use aisle_sync::PermissionCache;

    use crate::directory::InMemoryResourceDirectory;

    use super::*;

    const SECRET: &[u8] = b"test-secret";
    const ISSUER: &str = "https://aisle.test.auth0.com/";
    const AUDIENCE: &str = "https://api.aisle.app";

    struct Fixture {
        engine: AuthorizationEngine,
        provider: Arc<StaticProvider>,
        cache: Arc<PermissionCache>,
        directory: Arc<InMemoryResourceDirectory>,
    }

    fn fixture() -> Fixture {
        let provider = Arc::new(StaticProvider::new());
        let cache = Arc::new(PermissionCache::with_default_ttl());
        let orchestrator = Arc::new(SyncOrchestrator::new(cache.clone(), provider.clone()));
        let directory = Arc::new(InMemoryResourceDirectory::new());
        let verifier = Arc::new(JwtVerifier::hs256(SECRET, ISSUER, AUDIENCE));

        let engine = AuthorizationEngine::new(
            verifier,
            orchestrator,
            directory.clone(),
            EngineConfig::default(),
        );

        Fixture {
            engine,
            provider,
            cache,
            directory,
        }
    }

    fn subject() -> SubjectId {
        SubjectId::new("auth0|u1").unwrap()
    }

    fn org(id: &str) -> OrganizationId {
        OrganizationId::new(id).unwrap()
    }

    fn mint_token(expires_at: DateTime<Utc>) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &json!({
                "sub": "auth0|u1",
                "iss": ISSUER,
                "aud": AUDIENCE,
                "exp": expires_at.timestamp(),
            }),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn token() -> String {
        mint_token(Utc::now() + Duration::minutes(10))
    }

    fn vendor_snapshot(org_id: &str, perms: &[Permission]) -> SubjectSnapshot {
        SubjectSnapshot::assemble(
            subject(),
            vec![Role::new("Vendor Owner")],
            Vec::new(),
            vec![OrganizationMembership {
                organization_id: org(org_id),
                roles: vec![Role::new("Vendor Owner")],
                permissions: perms.to_vec(),
            }],
        )
    }

    #[tokio::test]
    async fn member_is_granted_on_own_vendor() {
        let f = fixture();
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::EDIT_VENDOR_INFO]));

        let vendor = VendorId::new();
        f.directory.insert(vendor, Some(org("org_w42")));

        let decision = f
            .engine
            .authorize(&token(), vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert_eq!(decision, AuthorizationDecision::granted());
    }

    #[tokio::test]
    async fn same_permission_denied_on_foreign_vendor() {
        let f = fixture();
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::EDIT_VENDOR_INFO]));

        let foreign_vendor = VendorId::new();
        f.directory.insert(foreign_vendor, Some(org("org_w43")));

        let decision = f
            .engine
            .authorize(&token(), foreign_vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert_eq!(
            decision,
            AuthorizationDecision::denied(DecisionReason::NoOrgMembership)
        );
    }

    #[tokio::test]
    async fn member_without_the_permission_is_missing_permission() {
        let f = fixture();
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::READ_VENDOR_INFO]));

        let vendor = VendorId::new();
        f.directory.insert(vendor, Some(org("org_w42")));

        let decision = f
            .engine
            .authorize(&token(), vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert_eq!(
            decision,
            AuthorizationDecision::denied(DecisionReason::MissingPermission)
        );
    }

    #[tokio::test]
    async fn invalid_token_is_terminal() {
        let f = fixture();
        let vendor = VendorId::new();
        f.directory.insert(vendor, Some(org("org_w42")));

        let decision = f
            .engine
            .authorize("garbage", vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert_eq!(
            decision,
            AuthorizationDecision::denied(DecisionReason::TokenInvalid)
        );

        let expired = mint_token(Utc::now() - Duration::minutes(1));
        let decision = f
            .engine
            .authorize(&expired, vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert_eq!(
            decision,
            AuthorizationDecision::denied(DecisionReason::TokenInvalid)
        );
    }

    #[tokio::test]
    async fn unreachable_provider_without_cache_fails_closed() {
        let f = fixture();
        f.provider
            .set_error(subject(), ProviderError::Unavailable("timeout".into()));

        let vendor = VendorId::new();
        f.directory.insert(vendor, Some(org("org_w42")));

        let decision = f
            .engine
            .authorize(&token(), vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::StaleAndUnreachable);
    }

    #[tokio::test]
    async fn degraded_snapshot_downgrades_high_risk_grant() {
        let f = fixture();
        f.provider
            .set_error(subject(), ProviderError::Unavailable("5xx".into()));

        // Stale entry (2×TTL old) that would allow the payment action.
        f.cache.put(
            vendor_snapshot(
                "org_w42",
                &[registry::MANAGE_PAYMENTS, registry::READ_VENDOR_INFO],
            ),
            Utc::now() - (f.cache.ttl() * 2),
        );

        let vendor = VendorId::new();
        f.directory.insert(vendor, Some(org("org_w42")));

        let decision = f
            .engine
            .authorize(&token(), vendor, &registry::MANAGE_PAYMENTS)
            .await;
        assert_eq!(
            decision,
            AuthorizationDecision::denied(DecisionReason::MissingPermission)
        );

        // Low-risk actions still work from the degraded fallback.
        let decision = f
            .engine
            .authorize(&token(), vendor, &registry::READ_VENDOR_INFO)
            .await;
        assert_eq!(decision, AuthorizationDecision::granted());
    }

    #[tokio::test]
    async fn legacy_resource_uses_global_permissions() {
        let f = fixture();
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::EDIT_VENDOR_INFO]));

        let legacy_vendor = VendorId::new();
        f.directory.insert(legacy_vendor, None);

        let decision = f
            .engine
            .authorize(&token(), legacy_vendor, &registry::EDIT_VENDOR_INFO)
            .await;
        assert_eq!(decision, AuthorizationDecision::granted());
    }

    #[tokio::test]
    async fn unknown_resource_is_denied() {
        let f = fixture();
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::EDIT_VENDOR_INFO]));

        let decision = f
            .engine
            .authorize(&token(), VendorId::new(), &registry::EDIT_VENDOR_INFO)
            .await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn force_sync_replaces_cached_grants() {
        let f = fixture();
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::EDIT_VENDOR_INFO]));

        f.engine.force_sync(&subject()).await.unwrap();

        // Provider now reports fewer grants; force_sync must pick that up
        // even though the cache is still fresh.
        f.provider
            .set_snapshot(vendor_snapshot("org_w42", &[registry::READ_VENDOR_INFO]));
        let synced = f.engine.force_sync(&subject()).await.unwrap();

        let membership = synced
            .entry
            .snapshot
            .membership(&org("org_w42"))
            .unwrap();
        assert_eq!(membership.permissions, vec![registry::READ_VENDOR_INFO]);
    }
}

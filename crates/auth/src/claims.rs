//! Bearer token verification (signature, issuer, audience, expiry).
//!
//! Tokens MAY embed a snapshot of roles/permissions/organization at issuance
//! time under namespaced custom claims. Those are extracted as *hints* only;
//! the authoritative source is the synced [`crate::SubjectSnapshot`].

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aisle_core::{OrganizationId, SubjectId};

use crate::{Permission, Role};

/// Namespace prefix for custom claims, matching the identity provider's
/// action configuration.
pub const CLAIMS_NAMESPACE: &str = "https://aisle.app";

/// Raw access-token claims (wire shape).
///
/// Only `sub` and `exp` are required; every namespaced claim is optional —
/// a token without permissions is a valid low-privilege token, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject identifier, as issued by the identity provider.
    pub sub: String,

    /// Expiry (unix seconds).
    pub exp: i64,

    /// Roles embedded at issuance time (hint).
    #[serde(rename = "https://aisle.app/roles", default)]
    pub roles: Vec<String>,

    /// Permissions embedded at issuance time (hint).
    #[serde(rename = "https://aisle.app/permissions", default)]
    pub permissions: Vec<String>,

    /// Organization the token was minted for (hint).
    #[serde(
        rename = "https://aisle.app/org_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub organization_id: Option<String>,
}

/// The outcome of successful token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: SubjectId,
    pub expires_at: DateTime<Utc>,

    /// Issuance-time hints. Never authoritative: they can go stale between
    /// issuance and use, so authorization always consults the synced snapshot.
    pub hinted_roles: Vec<Role>,
    pub hinted_permissions: Vec<Permission>,
    pub hinted_organization_id: Option<OrganizationId>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid signature")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("issuer or audience mismatch")]
    ClaimsMismatch,

    #[error("no signing key for kid '{0}'")]
    UnknownKey(String),

    #[error("invalid key set: {0}")]
    KeySet(String),

    #[error("invalid subject claim: {0}")]
    Subject(String),
}

/// Verifies a bearer token and extracts the identity it asserts.
///
/// Deterministic in `now` so expiry behavior is testable without clock games.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, TokenError>;
}

enum KeyStore {
    /// Shared-secret verification (dev/test parity with minted tokens).
    Hs256(DecodingKey),
    /// Published key set from the provider, keyed by `kid`.
    Jwks(HashMap<String, DecodingKey>),
}

/// JWT verifier over the provider's signing keys.
pub struct JwtVerifier {
    keys: KeyStore,
    issuer: String,
    audience: String,
}

impl JwtVerifier {
    /// HS256 verifier over a shared secret.
    pub fn hs256(secret: &[u8], issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            keys: KeyStore::Hs256(DecodingKey::from_secret(secret)),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// RS256 verifier over the provider's published JWKS document
    /// (`https://{domain}/.well-known/jwks.json`).
    pub fn from_jwks(
        jwks_json: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let jwks: jsonwebtoken::jwk::JwkSet =
            serde_json::from_str(jwks_json).map_err(|e| TokenError::KeySet(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            let key =
                DecodingKey::from_jwk(jwk).map_err(|e| TokenError::KeySet(e.to_string()))?;
            keys.insert(kid, key);
        }

        if keys.is_empty() {
            return Err(TokenError::KeySet("no usable keys (missing kid?)".into()));
        }

        Ok(Self {
            keys: KeyStore::Jwks(keys),
            issuer: issuer.into(),
            audience: audience.into(),
        })
    }

    fn resolve(&self, token: &str) -> Result<(Algorithm, &DecodingKey), TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        match &self.keys {
            KeyStore::Hs256(key) => {
                if header.alg != Algorithm::HS256 {
                    return Err(TokenError::BadSignature);
                }
                Ok((Algorithm::HS256, key))
            }
            KeyStore::Jwks(keys) => {
                if header.alg != Algorithm::RS256 {
                    return Err(TokenError::BadSignature);
                }
                let kid = header.kid.ok_or(TokenError::Malformed)?;
                let key = keys
                    .get(&kid)
                    .ok_or_else(|| TokenError::UnknownKey(kid.clone()))?;
                Ok((Algorithm::RS256, key))
            }
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, TokenError> {
        let (alg, key) = self.resolve(token)?;

        let mut validation = Validation::new(alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        // Expiry is checked against the caller-supplied clock below.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["iss", "aud"]);

        let data = decode::<AccessClaims>(token, key, &validation).map_err(map_decode_error)?;
        let claims = data.claims;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::Malformed)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }

        let subject_id =
            SubjectId::new(claims.sub).map_err(|e| TokenError::Subject(e.to_string()))?;
        let hinted_organization_id = match claims.organization_id {
            Some(raw) => Some(
                OrganizationId::new(raw).map_err(|e| TokenError::Subject(e.to_string()))?,
            ),
            None => None,
        };

        Ok(VerifiedIdentity {
            subject_id,
            expires_at,
            hinted_roles: claims.roles.into_iter().map(Role::new).collect(),
            hinted_permissions: claims.permissions.into_iter().map(Permission::new).collect(),
            hinted_organization_id,
        })
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => TokenError::ClaimsMismatch,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

//! `aisle-auth` — pure authentication/authorization boundary (zero-trust).
//!
//! This crate verifies identity tokens, models the subject's synced
//! role/permission snapshot, and narrows global permissions to a single
//! organization (tenant) scope. It is intentionally decoupled from HTTP and
//! storage; the network-facing pieces live in `aisle-idp` and `aisle-sync`.

pub mod claims;
pub mod permissions;
pub mod roles;
pub mod scope;
pub mod snapshot;

pub use claims::{AccessClaims, JwtVerifier, TokenError, TokenVerifier, VerifiedIdentity};
pub use permissions::{Permission, registry};
pub use roles::Role;
pub use scope::{EffectivePermissions, Resource, ScopeOrigin, scope};
pub use snapshot::{OrganizationMembership, SubjectSnapshot};

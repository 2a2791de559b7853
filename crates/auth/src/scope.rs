//! Scope resolution: narrowing a subject's snapshot to one resource's
//! organization.
//!
//! A permission granted in one organization must never leak to a resource
//! owned by a different organization, even when the subject holds the
//! same-named permission string elsewhere. The only exception is the legacy
//! path for resources created before organization-based isolation existed.

use std::collections::HashSet;

use serde::Serialize;

use aisle_core::{OrganizationId, VendorId};

use crate::{Permission, SubjectSnapshot};

/// A tenant-scoped business entity, seen through the authorization lens.
///
/// `owning_organization_id` is `None` for legacy resources that predate
/// organization-based isolation; those fall back to global permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub resource_id: VendorId,
    pub owning_organization_id: Option<OrganizationId>,
}

/// Where an effective permission set came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeOrigin {
    /// Narrowed to a single organization membership.
    Organization(OrganizationId),
    /// Legacy resource without an owning organization; global permissions
    /// apply directly.
    LegacyGlobal,
    /// The subject holds no membership in the resource's organization.
    /// Always an empty set.
    NoMembership,
}

/// The permissions a subject effectively holds against one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePermissions {
    origin: ScopeOrigin,
    permissions: HashSet<Permission>,
}

impl EffectivePermissions {
    pub fn origin(&self) -> &ScopeOrigin {
        &self.origin
    }

    /// Whether `required` is granted, honoring the wildcard `"*"`.
    pub fn allows(&self, required: &Permission) -> bool {
        self.permissions.contains(required)
            || self.permissions.iter().any(|p| p.is_wildcard())
    }

    pub fn allows_any<'a>(&self, required: impl IntoIterator<Item = &'a Permission>) -> bool {
        required.into_iter().any(|p| self.allows(p))
    }

    pub fn allows_all<'a>(&self, required: impl IntoIterator<Item = &'a Permission>) -> bool {
        required.into_iter().all(|p| self.allows(p))
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }
}

/// Narrow a subject's snapshot to the permissions that apply to `resource`.
///
/// - No IO
/// - No panics
/// - Fail-closed: an absent membership yields an empty set
pub fn scope(snapshot: &SubjectSnapshot, resource: &Resource) -> EffectivePermissions {
    let Some(owning_org) = &resource.owning_organization_id else {
        // Legacy path, kept until every resource carries an organization id.
        tracing::debug!(
            subject = %snapshot.subject_id,
            resource = %resource.resource_id,
            "scoping legacy resource from global permissions"
        );
        return EffectivePermissions {
            origin: ScopeOrigin::LegacyGlobal,
            permissions: snapshot.global_permissions.iter().cloned().collect(),
        };
    };

    match snapshot.membership(owning_org) {
        Some(membership) => EffectivePermissions {
            origin: ScopeOrigin::Organization(owning_org.clone()),
            permissions: membership.permissions.iter().cloned().collect(),
        },
        None => EffectivePermissions {
            origin: ScopeOrigin::NoMembership,
            permissions: HashSet::new(),
        },
    }
}

//! Subject authorization snapshot, mirrored from the identity provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use aisle_core::{OrganizationId, SubjectId};

use crate::{Permission, Role};

/// A subject's membership in one organization: which roles the subject holds
/// there and which permissions those roles grant *within that organization*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub organization_id: OrganizationId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

/// Point-in-time view of a subject's roles, permissions, and organization
/// memberships as the identity provider reported them.
///
/// # Invariants
/// - `global_permissions` is the union of all membership permissions plus any
///   platform-level (non-org-scoped) grants. It is computed in [`assemble`]
///   and never edited afterwards; a new snapshot replaces the old wholesale.
/// - Memberships are keyed by organization id; one entry per organization.
///
/// [`assemble`]: SubjectSnapshot::assemble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSnapshot {
    pub subject_id: SubjectId,
    pub global_roles: Vec<Role>,
    pub global_permissions: Vec<Permission>,
    pub organization_memberships: BTreeMap<OrganizationId, OrganizationMembership>,
}

impl SubjectSnapshot {
    /// A snapshot granting nothing. Used when the provider authoritatively
    /// rejects the subject (fail-closed collapse).
    pub fn empty(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            global_roles: Vec::new(),
            global_permissions: Vec::new(),
            organization_memberships: BTreeMap::new(),
        }
    }

    /// Assemble a snapshot from provider-reported data, computing
    /// `global_permissions` as the union of platform grants and every
    /// membership's permissions (deduplicated, order-stable).
    pub fn assemble(
        subject_id: SubjectId,
        global_roles: Vec<Role>,
        platform_permissions: Vec<Permission>,
        memberships: Vec<OrganizationMembership>,
    ) -> Self {
        let mut global_permissions = Vec::new();
        let mut push_unique = |perm: &Permission, out: &mut Vec<Permission>| {
            if !out.iter().any(|p| p == perm) {
                out.push(perm.clone());
            }
        };

        for perm in &platform_permissions {
            push_unique(perm, &mut global_permissions);
        }
        for membership in &memberships {
            for perm in &membership.permissions {
                push_unique(perm, &mut global_permissions);
            }
        }

        let organization_memberships = memberships
            .into_iter()
            .map(|m| (m.organization_id.clone(), m))
            .collect();

        Self {
            subject_id,
            global_roles,
            global_permissions,
            organization_memberships,
        }
    }

    pub fn membership(&self, organization_id: &OrganizationId) -> Option<&OrganizationMembership> {
        self.organization_memberships.get(organization_id)
    }

    pub fn grants_nothing(&self) -> bool {
        self.global_permissions.is_empty() && self.organization_memberships.is_empty()
    }
}

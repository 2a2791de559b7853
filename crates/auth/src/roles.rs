use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are intentionally opaque strings at this layer; the identity
/// provider owns the role → permission mapping, and the sync path only ever
/// mirrors its answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known role names configured in the identity provider.
pub mod well_known {
    use super::Role;

    pub const BRIDE: Role = Role::from_static("Bride");
    pub const GROOM: Role = Role::from_static("Groom");
    pub const WEDDING_PLANNER: Role = Role::from_static("Wedding Planner");
    pub const EVENT_ORGANIZER: Role = Role::from_static("Event Organizer");
    pub const GUEST: Role = Role::from_static("Guest");
    pub const ADMIN: Role = Role::from_static("Admin");

    // Organization-scoped vendor roles
    pub const VENDOR_OWNER: Role = Role::from_static("Vendor Owner");
    pub const VENDOR_MANAGER: Role = Role::from_static("Vendor Manager");
    pub const VENDOR_EMPLOYEE: Role = Role::from_static("Vendor Employee");
}

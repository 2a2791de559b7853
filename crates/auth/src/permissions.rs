use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings at the boundary (the identity
/// provider defines the vocabulary, e.g. "edit:vendor_info"). A special
/// wildcard permission `"*"` can be used by policy layers to indicate
/// "allow all" without hardcoding domain permissions into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed registry of the permission vocabulary the platform understands.
///
/// The boundary stays stringly-typed (the provider may issue permissions we
/// have never seen), but internal call sites should reference these constants
/// so typos surface at compile/test time instead of as silent denials.
pub mod registry {
    use super::Permission;

    // Event management
    pub const CREATE_EVENTS: Permission = Permission::from_static("create:events");
    pub const READ_EVENTS: Permission = Permission::from_static("read:events");
    pub const UPDATE_EVENTS: Permission = Permission::from_static("update:events");
    pub const DELETE_EVENTS: Permission = Permission::from_static("delete:events");

    // Vendor discovery (couples/planners)
    pub const VIEW_VENDORS: Permission = Permission::from_static("view:vendors");
    pub const INQUIRE_VENDORS: Permission = Permission::from_static("inquire:vendors");
    pub const MANAGE_VENDOR_RELATIONSHIPS: Permission =
        Permission::from_static("manage:vendor_relationships");

    // Vendor business management (organization-scoped)
    pub const READ_VENDOR_INFO: Permission = Permission::from_static("read:vendor_info");
    pub const EDIT_VENDOR_INFO: Permission = Permission::from_static("edit:vendor_info");
    pub const MANAGE_VENDOR_BOOKINGS: Permission =
        Permission::from_static("manage:vendor_bookings");
    pub const RESPOND_VENDOR_INQUIRIES: Permission =
        Permission::from_static("respond:vendor_inquiries");
    pub const VIEW_VENDOR_ANALYTICS: Permission =
        Permission::from_static("view:vendor_analytics");
    pub const MANAGE_VENDOR_TEAM: Permission = Permission::from_static("manage:vendor_team");

    // Guest management
    pub const MANAGE_GUESTS: Permission = Permission::from_static("manage:guests");
    pub const READ_GUESTS: Permission = Permission::from_static("read:guests");
    pub const INVITE_GUESTS: Permission = Permission::from_static("invite:guests");

    // Schedules
    pub const EDIT_SCHEDULES: Permission = Permission::from_static("edit:schedules");
    pub const READ_SCHEDULES: Permission = Permission::from_static("read:schedules");

    // Payments (high-risk)
    pub const MANAGE_PAYMENTS: Permission = Permission::from_static("manage:payments");
    pub const VIEW_PAYMENTS: Permission = Permission::from_static("view:payments");

    // Wedding planning
    pub const PLAN_WEDDING: Permission = Permission::from_static("plan:wedding");
    pub const VIEW_WEDDING: Permission = Permission::from_static("view:wedding");

    /// Every registered permission.
    pub const ALL: &[Permission] = &[
        CREATE_EVENTS,
        READ_EVENTS,
        UPDATE_EVENTS,
        DELETE_EVENTS,
        VIEW_VENDORS,
        INQUIRE_VENDORS,
        MANAGE_VENDOR_RELATIONSHIPS,
        READ_VENDOR_INFO,
        EDIT_VENDOR_INFO,
        MANAGE_VENDOR_BOOKINGS,
        RESPOND_VENDOR_INQUIRIES,
        VIEW_VENDOR_ANALYTICS,
        MANAGE_VENDOR_TEAM,
        MANAGE_GUESTS,
        READ_GUESTS,
        INVITE_GUESTS,
        EDIT_SCHEDULES,
        READ_SCHEDULES,
        MANAGE_PAYMENTS,
        VIEW_PAYMENTS,
        PLAN_WEDDING,
        VIEW_WEDDING,
    ];

    /// Whether a permission string is part of the registered vocabulary.
    pub fn is_registered(name: &str) -> bool {
        name == "*" || ALL.iter().any(|p| p.as_str() == name)
    }
}

//! Read-only lookup of a resource's owning organization.
//!
//! The authorization core never writes business data; this is its only
//! touchpoint with the resource store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use aisle_core::{OrganizationId, VendorId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("resource not found")]
    NotFound,

    #[error("resource directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves `resource_id` → `owning_organization_id`.
///
/// `Ok(None)` means the resource exists but predates organization-based
/// isolation (legacy); scope resolution falls back to global permissions.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn owning_organization(
        &self,
        resource_id: &VendorId,
    ) -> Result<Option<OrganizationId>, DirectoryError>;
}

/// In-memory directory, used by tests and the dev server.
#[derive(Default)]
pub struct InMemoryResourceDirectory {
    entries: RwLock<HashMap<VendorId, Option<OrganizationId>>>,
}

impl InMemoryResourceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resource_id: VendorId, owning_organization_id: Option<OrganizationId>) {
        self.entries
            .write()
            .unwrap()
            .insert(resource_id, owning_organization_id);
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryResourceDirectory {
    async fn owning_organization(
        &self,
        resource_id: &VendorId,
    ) -> Result<Option<OrganizationId>, DirectoryError> {
        self.entries
            .read()
            .unwrap()
            .get(resource_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}

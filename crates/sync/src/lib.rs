//! `aisle-sync` — permission cache and sync orchestration.
//!
//! Owns the only mutable shared state in the authorization core: the
//! per-subject permission cache. All writes funnel through the orchestrator's
//! single-flight section, so the cache's effective write discipline is one
//! writer per subject at a time, reads unrestricted.

pub mod cache;
pub mod orchestrator;
pub mod sweep;

pub use cache::{CacheEntry, PermissionCache};
pub use orchestrator::{Freshness, RefreshReason, SyncError, SyncOrchestrator, SyncedEntry};
pub use sweep::{SweepConfig, SweepHandle, spawn_sweeper};

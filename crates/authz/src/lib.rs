//! `aisle-authz` — the authorization decision point.
//!
//! Public entry point of the authorization core: composes token
//! verification, the sync orchestrator, and scope resolution into a single
//! `authorize(token, resource, action)` call that always resolves to a
//! structured allow/deny decision. Never fails open.

pub mod decision;
pub mod directory;
pub mod engine;

pub use decision::{AuthorizationDecision, DecisionReason};
pub use directory::{DirectoryError, InMemoryResourceDirectory, ResourceDirectory};
pub use engine::{AuthorizationEngine, EngineConfig};

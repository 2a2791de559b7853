//! `aisle-idp` — identity provider management-API client.
//!
//! The only crate that talks to the identity provider over the network.
//! It performs one logical fetch per invocation with a bounded timeout and
//! no internal retry; retry/backoff policy belongs to the sync orchestrator
//! so it stays centrally observable and testable.

pub mod http;
pub mod provider;

pub use http::{HttpIdentityProvider, ProviderConfig};
pub use provider::{IdentityProvider, ProviderError, StaticProvider};

//! The decision object returned by every `authorize` call.

use serde::Serialize;

/// Why a decision came out the way it did.
///
/// Safe to log server-side; the web layer decides how much to expose
/// externally (a denial must not leak organization topology to callers
/// who hold no membership).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    Granted,
    MissingPermission,
    NoOrgMembership,
    StaleAndUnreachable,
    TokenInvalid,
}

/// Outcome of one `authorize` call. Produced fresh per call, derived from
/// cached snapshot state; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    pub fn granted() -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Granted,
        }
    }

    pub fn denied(reason: DecisionReason) -> Self {
        debug_assert!(reason != DecisionReason::Granted);
        Self {
            allowed: false,
            reason,
        }
    }
}

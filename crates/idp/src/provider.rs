//! Provider abstraction and error taxonomy.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use aisle_auth::SubjectSnapshot;
use aisle_core::SubjectId;

/// Failure taxonomy for a provider fetch.
///
/// The distinction matters to callers: `Unavailable` may be retried (on the
/// next trigger, rate-limited by the cache TTL), `Rejected` is authoritative
/// and must never be retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, timeout, or provider-side 5xx. Transient.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// The provider authoritatively denied the subject (not found, malformed
    /// response body). Treat as "this subject grants nothing".
    #[error("identity provider rejected subject: {0}")]
    Rejected(String),
}

/// Fetches the authoritative role/permission/organization data for a subject.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch(&self, subject_id: &SubjectId) -> Result<SubjectSnapshot, ProviderError>;
}

/// In-memory provider double with canned per-subject answers.
///
/// Counts fetches so tests can assert single-flight behavior.
#[derive(Default)]
pub struct StaticProvider {
    answers: Mutex<HashMap<SubjectId, Result<SubjectSnapshot, ProviderError>>>,
    fetches: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, snapshot: SubjectSnapshot) {
        self.answers
            .lock()
            .unwrap()
            .insert(snapshot.subject_id.clone(), Ok(snapshot));
    }

    pub fn set_error(&self, subject_id: SubjectId, error: ProviderError) {
        self.answers.lock().unwrap().insert(subject_id, Err(error));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn fetch(&self, subject_id: &SubjectId) -> Result<SubjectSnapshot, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get(subject_id)
            .cloned()
            .unwrap_or_else(|| {
                Err(ProviderError::Rejected(format!(
                    "unknown subject {subject_id}"
                )))
            })
    }
}

//! Refresh orchestration: decides *when* a subject's cached permissions are
//! refreshed and guarantees at most one in-flight provider fetch per subject.
//!
//! Single-flight is a correctness property here, not an optimization: the
//! identity provider enforces per-subject rate limits, so N concurrent
//! triggers for one subject must collapse into exactly one fetch whose result
//! every waiter shares.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;

use aisle_auth::SubjectSnapshot;
use aisle_core::SubjectId;
use aisle_idp::{IdentityProvider, ProviderError};

use crate::cache::{CacheEntry, PermissionCache};

/// Why a refresh was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// Login always refreshes synchronously; never serves stale.
    Login,
    /// Lazy, traffic-driven trigger: refresh only if the entry is stale.
    Stale,
    /// Administrative invalidate-then-refresh.
    ForceSync,
}

/// How much the returned entry can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Entry comes from a successful fetch within its TTL.
    Fresh,
    /// Stale entry served as a fallback while the provider is unreachable.
    /// Callers may restrict high-risk actions under this marking.
    Degraded,
}

/// A cache entry plus its trust marking.
#[derive(Debug, Clone)]
pub struct SyncedEntry {
    pub entry: Arc<CacheEntry>,
    pub freshness: Freshness,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No cached entry exists and the provider is unreachable. Fail closed.
    #[error("no cached permissions and identity provider unreachable")]
    StaleAndUnreachable,
}

type RefreshOutcome = Result<SyncedEntry, SyncError>;
type FlightMap = HashMap<SubjectId, watch::Receiver<Option<RefreshOutcome>>>;

/// Coordinates cache reads and provider fetches. The exclusive writer of the
/// permission cache.
pub struct SyncOrchestrator {
    cache: Arc<PermissionCache>,
    provider: Arc<dyn IdentityProvider>,
    in_flight: Arc<Mutex<FlightMap>>,
}

impl SyncOrchestrator {
    pub fn new(cache: Arc<PermissionCache>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            cache,
            provider,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Return a usable entry for `subject_id`, refreshing if the trigger
    /// demands it. See [`RefreshReason`] for per-trigger policy.
    pub async fn ensure_fresh(
        &self,
        subject_id: &SubjectId,
        reason: RefreshReason,
    ) -> Result<SyncedEntry, SyncError> {
        match reason {
            RefreshReason::Stale => {
                // Cheap path: a TTL-fresh entry never touches the network.
                if let Some(entry) = self.cache.get(subject_id) {
                    if entry.is_fresh(Utc::now()) {
                        return Ok(SyncedEntry {
                            entry,
                            freshness: Freshness::Fresh,
                        });
                    }
                }
            }
            RefreshReason::Login => {}
            RefreshReason::ForceSync => {
                self.cache.invalidate(subject_id);
            }
        }

        self.refresh_now(subject_id).await
    }

    /// Join the in-flight refresh for this subject, or lead a new one.
    ///
    /// Also used by the proactive sweep to refresh entries nearing expiry
    /// without waiting for them to turn stale.
    pub async fn refresh_now(&self, subject_id: &SubjectId) -> Result<SyncedEntry, SyncError> {
        let mut rx = {
            let mut flights = self.in_flight.lock().unwrap();
            if let Some(rx) = flights.get(subject_id) {
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                flights.insert(subject_id.clone(), rx.clone());

                // The refresh runs as its own task: a waiter abandoning its
                // request must not cancel the fetch, which always completes
                // and populates the cache for subsequent callers.
                let cache = self.cache.clone();
                let provider = self.provider.clone();
                let in_flight = self.in_flight.clone();
                let subject = subject_id.clone();
                tokio::spawn(async move {
                    let outcome = refresh(&cache, provider.as_ref(), &subject).await;
                    // Remove the flight before publishing so a caller arriving
                    // after completion leads a new refresh instead of reusing
                    // a finished one.
                    in_flight.lock().unwrap().remove(&subject);
                    let _ = tx.send(Some(outcome));
                });

                rx
            }
        };

        let outcome = rx
            .wait_for(|result| result.is_some())
            .await
            // Sender dropped without publishing (refresh task panicked):
            // indeterminate state resolves to deny.
            .map_err(|_| SyncError::StaleAndUnreachable)?
            .clone();

        outcome.unwrap_or(Err(SyncError::StaleAndUnreachable))
    }
}

/// One provider fetch and its complete failure taxonomy. Nothing here
/// retries; an `Unavailable` is naturally retried on the next trigger,
/// rate-limited by the TTL.
async fn refresh(
    cache: &PermissionCache,
    provider: &dyn IdentityProvider,
    subject_id: &SubjectId,
) -> RefreshOutcome {
    match provider.fetch(subject_id).await {
        Ok(snapshot) => {
            let entry = cache.put(snapshot, Utc::now());
            tracing::debug!(subject = %subject_id, "permissions refreshed");
            Ok(SyncedEntry {
                entry,
                freshness: Freshness::Fresh,
            })
        }
        Err(ProviderError::Rejected(detail)) => {
            // Authoritative: the subject may have been removed from the
            // provider. Drop any cached grants and collapse to empty.
            tracing::warn!(subject = %subject_id, %detail, "provider rejected subject; collapsing permissions");
            cache.invalidate(subject_id);
            let entry = Arc::new(CacheEntry {
                subject_id: subject_id.clone(),
                snapshot: Arc::new(SubjectSnapshot::empty(subject_id.clone())),
                fetched_at: Utc::now(),
                ttl: cache.ttl(),
            });
            Ok(SyncedEntry {
                entry,
                freshness: Freshness::Fresh,
            })
        }
        Err(ProviderError::Unavailable(detail)) => match cache.get(subject_id) {
            Some(stale) => {
                tracing::warn!(subject = %subject_id, %detail, "provider unavailable; serving stale entry degraded");
                Ok(SyncedEntry {
                    entry: stale,
                    freshness: Freshness::Degraded,
                })
            }
            None => {
                tracing::warn!(subject = %subject_id, %detail, "provider unavailable and no cached entry; failing closed");
                Err(SyncError::StaleAndUnreachable)
            }
        },
    }
}

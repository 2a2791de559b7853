//! Process-local permission cache with a TTL staleness policy.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use aisle_auth::SubjectSnapshot;
use aisle_core::SubjectId;

/// Default freshness window (5 minutes).
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Per-subject cached authorization state.
///
/// Either entirely absent from the cache or fully populated; readers never
/// observe a partially-synced entry (entries are replaced wholesale behind
/// an `Arc` swap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub subject_id: SubjectId,
    pub snapshot: Arc<SubjectSnapshot>,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Whether the entry is within its freshness window.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < self.ttl
    }

    /// Time remaining until the entry turns stale (negative once stale).
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.ttl - (now - self.fetched_at)
    }
}

/// Subject id → cached snapshot. The only mutable shared state in the core.
///
/// Reads never block on a concurrent fill; a miss is just a miss, and the
/// orchestrator decides what to do about it.
pub struct PermissionCache {
    entries: RwLock<HashMap<SubjectId, Arc<CacheEntry>>>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Non-blocking read. Stale entries are returned too; callers decide
    /// whether staleness matters (fallback policy lives in the orchestrator).
    pub fn get(&self, subject_id: &SubjectId) -> Option<Arc<CacheEntry>> {
        self.entries.read().unwrap().get(subject_id).cloned()
    }

    /// Replace a subject's entry wholesale. Concurrent readers observe either
    /// the old entry or the new one, never a mix.
    pub fn put(&self, snapshot: SubjectSnapshot, fetched_at: DateTime<Utc>) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            subject_id: snapshot.subject_id.clone(),
            snapshot: Arc::new(snapshot),
            fetched_at,
            ttl: self.ttl,
        });
        self.entries
            .write()
            .unwrap()
            .insert(entry.subject_id.clone(), entry.clone());
        entry
    }

    /// Drop a subject's entry (logout, rejection, manual force-sync).
    pub fn invalidate(&self, subject_id: &SubjectId) -> bool {
        self.entries.write().unwrap().remove(subject_id).is_some()
    }

    /// Subjects whose entries turn stale within `margin` (or already have).
    /// Used by the optional proactive sweep.
    pub fn subjects_near_expiry(&self, now: DateTime<Utc>, margin: Duration) -> Vec<SubjectId> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.remaining(now) <= margin)
            .map(|e| e.subject_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    fn snapshot(id: &str) -> SubjectSnapshot {
        SubjectSnapshot::empty(subject(id))
    }

    #[test]
    fn miss_then_hit() {
        let cache = PermissionCache::with_default_ttl();
        assert!(cache.get(&subject("auth0|u1")).is_none());

        cache.put(snapshot("auth0|u1"), Utc::now());
        let entry = cache.get(&subject("auth0|u1")).unwrap();
        assert_eq!(entry.subject_id, subject("auth0|u1"));
    }

    #[test]
    fn entry_within_ttl_is_fresh_after_ttl_is_stale() {
        let cache = PermissionCache::new(Duration::seconds(60));
        let now = Utc::now();
        let entry = cache.put(snapshot("auth0|u1"), now);

        assert!(entry.is_fresh(now + Duration::seconds(59)));
        assert!(!entry.is_fresh(now + Duration::seconds(60)));
    }

    #[test]
    fn put_replaces_wholesale() {
        let cache = PermissionCache::with_default_ttl();
        let t0 = Utc::now();
        cache.put(snapshot("auth0|u1"), t0);

        let t1 = t0 + Duration::seconds(10);
        cache.put(snapshot("auth0|u1"), t1);

        let entry = cache.get(&subject("auth0|u1")).unwrap();
        assert_eq!(entry.fetched_at, t1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = PermissionCache::with_default_ttl();
        cache.put(snapshot("auth0|u1"), Utc::now());

        assert!(cache.invalidate(&subject("auth0|u1")));
        assert!(!cache.invalidate(&subject("auth0|u1")));
        assert!(cache.get(&subject("auth0|u1")).is_none());
    }

    #[test]
    fn near_expiry_sweep_candidates() {
        let cache = PermissionCache::new(Duration::seconds(60));
        let now = Utc::now();
        cache.put(snapshot("auth0|old"), now - Duration::seconds(50));
        cache.put(snapshot("auth0|new"), now);

        let near = cache.subjects_near_expiry(now, Duration::seconds(15));
        assert_eq!(near, vec![subject("auth0|old")]);
    }
}

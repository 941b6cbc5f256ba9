use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::utils::normalize_cache_key;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Count-bounded cache with per-entry expiry and least-recently-used eviction.
///
/// Keys are trimmed and lowercased before use. Expired entries are only
/// reclaimed when read or when capacity pressure evicts them, so `len()` may
/// include stale entries nobody has asked for yet.
#[derive(Debug)]
pub struct TtlLruCache<T> {
    store: Mutex<LruCache<String, CacheEntry<T>>>,
    max_entries: NonZeroUsize,
    ttl: Duration,
}

impl<T: Clone> TtlLruCache<T> {
    pub fn new(max_entries: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            store: Mutex::new(LruCache::new(max_entries)),
            max_entries,
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let key = normalize_cache_key(key);
        let mut store = self.lock();

        let expired = store.peek(&key)?.is_expired(Instant::now());
        if expired {
            store.pop(&key);
            return None;
        }

        // `get` moves the entry to the most-recently-used position.
        store.get(&key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: T) {
        let key = normalize_cache_key(key);
        let mut store = self.lock();

        if store.pop(&key).is_none() && store.len() >= self.max_entries.get() {
            if let Some((evicted, _)) = store.pop_lru() {
                tracing::debug!("Evicted least recently used cache entry {:?}", evicted);
            }
        }

        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).unwrap_or_else(|| far_future(now));
        store.put(key, CacheEntry { value, expires_at });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries.get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Every critical section leaves the store consistent, so a poisoned lock
    // is still safe to reuse.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<T>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// TTLs too large to represent are treated as "effectively never".
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(100 * 365 * 24 * 60 * 60)
}

//! Response cache for the proxy
//!
//! Entries expire after a fixed TTL, checked when read. The store is bounded:
//! once `capacity` keys are cached the least recently used one is dropped.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use lru::LruCache;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A stored upstream response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub timestamp: Instant,
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

pub trait ResponseCache: Send + Sync {
    /// A fresh entry for `key`, if any.
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: String, entry: CacheEntry);
}

pub struct TtlCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResponseCache for TtlCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.timestamp) < self.ttl => {
                return Some(entry.clone());
            }
            Some(_) => {}
            None => return None,
        }

        entries.pop(key);
        None
    }

    fn set(&self, key: String, entry: CacheEntry) {
        self.lock().put(key, entry);
    }
}

//! In-memory translation cache with TTL and sweep-based capacity control.
//! Key: blake3 hash of (src_lang | tgt_lang | text).
//! Capacity is enforced by `evict_expired_and_overflow`, not by `insert`.

use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

pub type CacheKey = [u8; 32];

struct CacheEntry {
    translation: String,
    inserted_at: Instant,
}

pub struct TranslationCache {
    inner: Mutex<LruCache<CacheKey, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl TranslationCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::unbounded()),
            capacity,
            ttl,
        }
    }

    /// Compute the cache key from translation parameters.
    pub fn compute_key(src_lang: &str, tgt_lang: &str, text: &str) -> CacheKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(src_lang.as_bytes());
        hasher.update(b"|");
        hasher.update(tgt_lang.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Look up a cached translation. Returns None if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<String> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            if now.saturating_duration_since(entry.inserted_at) < self.ttl {
                return Some(entry.translation.clone());
            }
            cache.pop(key);
        }
        None
    }

    /// Insert or replace a translation.
    pub fn insert(&self, key: CacheKey, translation: String) {
        self.insert_at(key, translation, Instant::now());
    }

    pub fn insert_at(&self, key: CacheKey, translation: String, inserted_at: Instant) {
        self.inner.lock().put(
            key,
            CacheEntry {
                translation,
                inserted_at,
            },
        );
    }

    /// Drop expired entries, then shrink to half capacity if still over it.
    /// Returns how many entries were removed.
    pub fn evict_expired_and_overflow(&self) -> usize {
        self.evict_expired_and_overflow_at(Instant::now())
    }

    pub fn evict_expired_and_overflow_at(&self, now: Instant) -> usize {
        let mut cache = self.inner.lock();
        let before = cache.len();

        let expired: Vec<CacheKey> = cache
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.inserted_at) >= self.ttl)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            cache.pop(key);
        }

        if cache.len() > self.capacity {
            let target = self.capacity / 2;
            while cache.len() > target {
                if cache.pop_lru().is_none() {
                    break;
                }
            }
        }

        let removed = before - cache.len();
        if removed > 0 {
            debug!(
                expired = expired.len(),
                removed,
                remaining = cache.len(),
                "cache_sweep"
            );
        }
        removed
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

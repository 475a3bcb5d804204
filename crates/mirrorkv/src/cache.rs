//! In-memory mirror of one durable bucket.
//!
//! The mirror is the read path of the store: once seeded it answers every
//! get/exists/len/snapshot without touching the durable medium. A single
//! `RwLock` guards the map and the entry counter is only adjusted while the
//! write half of that lock is held, so the counter always equals the map's
//! cardinality outside the one mutation holding the lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of reads answered from the mirror
    pub hits: AtomicU64,
    /// Number of reads for keys the mirror does not hold
    pub misses: AtomicU64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }
}

/// Concurrency-safe key/value mirror with an O(1) entry count.
pub struct MirrorCache {
    /// Mirrored entries protected by RwLock
    entries: RwLock<HashMap<String, Bytes>>,
    /// Entry count; adjusted only while the write lock is held
    count: AtomicU64,
    /// Read statistics
    stats: CacheStats,
}

impl MirrorCache {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            count: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    /// Seed the mirror from a durable snapshot. Called once at startup.
    pub fn load(&self, entries: Vec<(String, Bytes)>) {
        let mut map = self.entries.write();
        for (key, value) in entries {
            if map.insert(key, value).is_none() {
                self.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Look up `key`, returning an owned copy of the value.
    ///
    /// `Bytes` is immutable, so the returned handle can never be used to
    /// corrupt mirror-owned storage.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(value) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check whether `key` is mirrored.
    pub fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Upsert an entry. Returns `true` iff the key was not present before,
    /// in which case the count went up by one.
    pub fn insert(&self, key: impl Into<String>, value: Bytes) -> bool {
        let mut entries = self.entries.write();
        let inserted = entries.insert(key.into(), value).is_none();
        if inserted {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    /// Remove an entry. Returns whether removal occurred; the count goes
    /// down by one only when it did.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        let removed = entries.remove(key).is_some();
        if removed {
            self.count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Point-in-time copy of every mirrored entry.
    pub fn snapshot(&self) -> HashMap<String, Bytes> {
        self.entries.read().clone()
    }

    /// Pick a key approximately uniformly at random, `None` when empty.
    ///
    /// The index is drawn from the counter before the lock is taken, so a
    /// concurrent remove can leave it past the end of the walk; the first
    /// key visited stands in rather than returning nothing. Selection is
    /// best-effort uniform under concurrent mutation, exact when quiescent.
    pub fn random_key(&self) -> Option<String> {
        use rand::Rng;

        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        let mut remaining = rand::thread_rng().gen_range(0..count);

        let entries = self.entries.read();
        let mut fallback = None;
        for key in entries.keys() {
            if fallback.is_none() {
                fallback = Some(key);
            }
            if remaining == 0 {
                return Some(key.clone());
            }
            remaining -= 1;
        }
        fallback.cloned()
    }

    /// Current number of mirrored entries. O(1).
    pub fn len(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns `true` if the mirror holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl Default for MirrorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MirrorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorCache")
            .field("entry_count", &self.len())
            .finish()
    }
}

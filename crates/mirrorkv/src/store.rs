//! Write-through store: durable bucket + in-memory mirror.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use mirrorkv_durable::DurableStore;
use tracing::{info, warn};

use crate::cache::{CacheStats, MirrorCache};
use crate::error::{Error, Result};

/// Uniform storage interface.
///
/// All implementations must satisfy these invariants:
/// - Every mutation is committed to the durable medium before it becomes
///   visible to readers; a reported success survives a process restart.
/// - Reads never touch the durable medium once the store is open.
/// - `len` equals the number of entries `get_all` would return.
/// - Absence is reported through `Option`/`bool` results, never an error.
pub trait Storage: Send + Sync {
    /// Check whether `key` is present.
    fn exist(&self, key: &str) -> bool;

    /// Look up `key`, returning an owned copy of the value.
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Durably remove `key`, then drop it from the mirror.
    ///
    /// Returns whether the durable delete succeeded; removing an absent key
    /// succeeds as a no-op. The underlying error detail is deliberately not
    /// part of this contract.
    fn delete(&self, key: &str) -> bool;

    /// Durably store `value` under `key`, then mirror it.
    fn add_or_update(&self, key: &str, value: Bytes) -> Result<()>;

    /// Point-in-time copy of every entry.
    fn get_all(&self) -> HashMap<String, Bytes>;

    /// Number of entries. O(1).
    fn len(&self) -> u64;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick a stored key approximately uniformly at random.
    fn random_key(&self) -> Option<String>;

    /// Release the durable connection. Callers must sequence this after all
    /// in-flight operations have completed.
    fn close(self: Box<Self>);
}

/// Durable key-value store fronted by an in-memory mirror.
///
/// Mutations go to the durable bucket first; only on success is the mirror
/// updated. Reads are served from the mirror alone. Between a durable
/// commit and the mirror update there is a narrow window in which readers
/// see the pre-write state; this staleness is bounded by one mutation and
/// is accepted in exchange for never blocking readers on the medium.
pub struct MirrorStore {
    durable: DurableStore,
    cache: MirrorCache,
}

impl MirrorStore {
    /// Open the bucket `bucket` in the container at `path` and seed the
    /// mirror with a full scan of the bucket's durable state.
    ///
    /// Fails with [`Error::InvalidArgument`] if `path` or `bucket` is
    /// empty, and with a durable error if the medium cannot be opened.
    pub fn open(path: impl AsRef<Path>, bucket: &str) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_argument("container path is empty"));
        }
        if bucket.is_empty() {
            return Err(Error::invalid_argument("bucket name is empty"));
        }

        let durable = DurableStore::open(path, bucket)?;
        let cache = MirrorCache::new();
        cache.load(durable.load_entries()?);

        info!(
            "Mirrored {} entries from bucket '{}' of {}",
            cache.len(),
            bucket,
            path.display()
        );
        Ok(Self { durable, cache })
    }

    /// Check whether `key` is present. Mirror lookup only.
    pub fn exist(&self, key: &str) -> bool {
        self.cache.exists(key)
    }

    /// Look up `key`. Mirror lookup only; returns an owned copy.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.cache.get(key)
    }

    /// Durably store `value` under `key`; mirror it only once the commit
    /// has succeeded. The count goes up iff the key is new.
    pub fn add_or_update(&self, key: &str, value: Bytes) -> Result<()> {
        self.durable.put(key, &value)?;
        self.cache.insert(key, value);
        Ok(())
    }

    /// Durably remove `key`; drop it from the mirror only once the commit
    /// has succeeded. Returns whether the durable delete went through;
    /// deleting an absent key is a successful no-op.
    pub fn delete(&self, key: &str) -> bool {
        match self.durable.delete(key) {
            Ok(_) => {
                self.cache.remove(key);
                true
            }
            Err(e) => {
                warn!("Durable delete of '{}' failed: {}", key, e);
                false
            }
        }
    }

    /// Point-in-time copy of every entry. Never touches the durable medium.
    pub fn get_all(&self) -> HashMap<String, Bytes> {
        self.cache.snapshot()
    }

    /// Number of entries. O(1).
    pub fn len(&self) -> u64 {
        self.cache.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Pick a stored key approximately uniformly at random; `None` when
    /// the store is empty. See [`MirrorCache::random_key`] for the exact
    /// guarantee under concurrent mutation.
    pub fn random_key(&self) -> Option<String> {
        self.cache.random_key()
    }

    /// Mirror read statistics.
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Name of the bucket this store is scoped to.
    pub fn bucket(&self) -> &str {
        self.durable.bucket()
    }

    /// Release the durable connection; the mirror is discarded with the
    /// handle. Consuming `self` keeps close-while-in-use a compile error
    /// for direct owners; `Arc` holders must sequence shutdown themselves.
    pub fn close(self) {
        self.durable.close();
    }
}

impl Storage for MirrorStore {
    fn exist(&self, key: &str) -> bool {
        MirrorStore::exist(self, key)
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        MirrorStore::get(self, key)
    }

    fn delete(&self, key: &str) -> bool {
        MirrorStore::delete(self, key)
    }

    fn add_or_update(&self, key: &str, value: Bytes) -> Result<()> {
        MirrorStore::add_or_update(self, key, value)
    }

    fn get_all(&self) -> HashMap<String, Bytes> {
        MirrorStore::get_all(self)
    }

    fn len(&self) -> u64 {
        MirrorStore::len(self)
    }

    fn random_key(&self) -> Option<String> {
        MirrorStore::random_key(self)
    }

    fn close(self: Box<Self>) {
        MirrorStore::close(*self);
    }
}

impl std::fmt::Debug for MirrorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorStore")
            .field("bucket", &self.bucket())
            .field("entry_count", &self.len())
            .finish()
    }
}

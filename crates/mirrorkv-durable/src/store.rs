//! Bucket-scoped durable store backed by redb.
//!
//! Every mutation runs in its own write transaction (begin, single-key
//! change, commit), so the durable state never reflects a partial write.
//! The bucket table is created eagerly at open so later read transactions
//! never encounter a missing table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::registry;

/// Error type for durable store operations
#[derive(Debug, thiserror::Error)]
pub enum DurableError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for DurableError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

pub type DurableResult<T> = Result<T, DurableError>;

/// Handle on one named bucket inside a durable container.
///
/// Several handles may be open on the same container path at once; they
/// share a single underlying `Database` through the container registry.
/// Buckets are fully independent key namespaces.
#[derive(Debug)]
pub struct DurableStore {
    db: Arc<Database>,
    bucket: String,
    path: PathBuf,
}

impl DurableStore {
    /// Open (or create) the bucket `bucket` in the container at `path`.
    ///
    /// Fails with [`DurableError::InvalidArgument`] if either the path or
    /// the bucket name is empty.
    pub fn open(path: impl AsRef<Path>, bucket: &str) -> DurableResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(DurableError::InvalidArgument(
                "container path is empty".to_string(),
            ));
        }
        if bucket.is_empty() {
            return Err(DurableError::InvalidArgument(
                "bucket name is empty".to_string(),
            ));
        }

        let db = registry::open_container(path)?;
        let store = Self {
            db,
            bucket: bucket.to_string(),
            path: path.to_path_buf(),
        };

        // Create the bucket table eagerly so later read txns don't fail
        let write_txn = store.db.begin_write()?;
        {
            let _t = write_txn.open_table(store.table())?;
        }
        write_txn.commit()?;

        debug!(
            "Opened bucket '{}' of container {}",
            store.bucket,
            store.path.display()
        );
        Ok(store)
    }

    fn table(&self) -> TableDefinition<'_, &'static str, &'static [u8]> {
        TableDefinition::new(&self.bucket)
    }

    /// Durably store `value` under `key`, replacing any prior value.
    pub fn put(&self, key: &str, value: &[u8]) -> DurableResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table())?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Durably remove `key`. Returns whether the key existed; removing an
    /// absent key commits as a no-op.
    pub fn delete(&self, key: &str) -> DurableResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(self.table())?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Point read straight from the durable medium.
    ///
    /// The mirror above this crate serves regular reads; this exists for
    /// tests and diagnostics.
    pub fn get(&self, key: &str) -> DurableResult<Option<Bytes>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table())?;
        Ok(table.get(key)?.map(|v| Bytes::copy_from_slice(v.value())))
    }

    /// Scan the whole bucket, copying every entry into owned storage.
    ///
    /// Called once at startup to seed the mirror.
    pub fn load_entries(&self) -> DurableResult<Vec<(String, Bytes)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table())?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let key = entry.0.value().to_string();
            let value = Bytes::copy_from_slice(entry.1.value());
            result.push((key, value));
        }
        Ok(result)
    }

    /// Name of the bucket this handle is scoped to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Container path this handle was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release this handle. The container file itself closes when the last
    /// handle on its path is dropped.
    pub fn close(self) {
        debug!(
            "Closed bucket '{}' of container {}",
            self.bucket,
            self.path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(bucket: &str) -> (DurableStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path().join("test.redb"), bucket).unwrap();
        (store, dir)
    }

    #[test]
    fn test_open_rejects_empty_path() {
        let err = DurableStore::open("", "b").unwrap_err();
        assert!(matches!(err, DurableError::InvalidArgument(_)));
    }

    #[test]
    fn test_open_rejects_empty_bucket() {
        let dir = TempDir::new().unwrap();
        let err = DurableStore::open(dir.path().join("test.redb"), "").unwrap_err();
        assert!(matches!(err, DurableError::InvalidArgument(_)));
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (store, _dir) = test_store("b");
        assert_eq!(store.bucket(), "b");
        store.put("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Bytes::from_static(b"v")));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_prior_value() {
        let (store, _dir) = test_store("b");
        store.put("k", b"v1").unwrap();
        store.put("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Bytes::from_static(b"v2")));
        assert_eq!(store.load_entries().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_reports_existence() {
        let (store, _dir) = test_store("b");
        store.put("k", b"v").unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_load_entries_returns_all_pairs() {
        let (store, _dir) = test_store("b");
        store.put("a", b"1").unwrap();
        store.put("b", b"2").unwrap();
        store.put("c", b"3").unwrap();

        let mut entries = store.load_entries().unwrap();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), Bytes::from_static(b"1")),
                ("b".to_string(), Bytes::from_static(b"2")),
                ("c".to_string(), Bytes::from_static(b"3")),
            ]
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.redb");
        {
            let store = DurableStore::open(&path, "b").unwrap();
            store.put("k", b"v").unwrap();
            store.close();
        }
        let store = DurableStore::open(&path, "b").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Bytes::from_static(b"v")));
    }

    #[test]
    fn test_buckets_are_independent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.redb");

        // Both handles open at the same time on one container.
        let b1 = DurableStore::open(&path, "b1").unwrap();
        let b2 = DurableStore::open(&path, "b2").unwrap();

        b1.put("k", b"from-b1").unwrap();
        assert_eq!(b2.get("k").unwrap(), None);
        assert!(b2.load_entries().unwrap().is_empty());

        b2.put("k", b"from-b2").unwrap();
        assert_eq!(b1.get("k").unwrap(), Some(Bytes::from_static(b"from-b1")));
        assert_eq!(b2.get("k").unwrap(), Some(Bytes::from_static(b"from-b2")));
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("nested").join("test.redb");
        let store = DurableStore::open(&nested, "b").unwrap();
        store.put("k", b"v").unwrap();
        assert!(nested.exists());
        assert_eq!(store.path(), nested);
    }
}

//! Process-local registry of open containers.
//!
//! redb allows a single open `Database` per file, but several bucket handles
//! may be open on the same container at once. The registry maps absolute
//! container paths to live database handles so that every `DurableStore` on
//! one path shares the same `Database`. Entries are held weakly: the file is
//! released as soon as the last handle on it is dropped, and dead entries
//! are pruned on the next open.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use redb::Database;
use tracing::debug;

use crate::store::DurableResult;

static CONTAINERS: OnceLock<Mutex<HashMap<PathBuf, Weak<Database>>>> = OnceLock::new();

fn containers() -> &'static Mutex<HashMap<PathBuf, Weak<Database>>> {
    CONTAINERS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Open the container at `path`, reusing the live handle if this process
/// already has it open. Creates the database file (and its parent
/// directory) if absent.
pub(crate) fn open_container(path: &Path) -> DurableResult<Arc<Database>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut map = containers().lock();
    map.retain(|_, db| db.strong_count() > 0);

    if let Some(db) = map.get(&key).and_then(Weak::upgrade) {
        debug!("Reusing open container {}", key.display());
        return Ok(db);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Arc::new(Database::create(path)?);
    map.insert(key, Arc::downgrade(&db));
    Ok(db)
}

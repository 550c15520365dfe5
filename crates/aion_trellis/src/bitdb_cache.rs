//! Shared, load-once cache of tile bit databases.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::bitdb::TileBitDatabase;
use crate::error::{read_file, DatabaseResult};
use crate::locator::TileLocator;

/// Constructs a [`TileBitDatabase`] from its backing file.
///
/// The cache calls this at most once per tile locator. Implementations other
/// than [`FileBitDatabaseLoader`] are mainly useful in tests.
pub trait TileBitDatabaseLoader: Send + Sync {
    /// Loads the database stored at `path`.
    fn load(&self, path: &Path) -> DatabaseResult<TileBitDatabase>;
}

/// Reads and parses `bits.db` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBitDatabaseLoader;

impl TileBitDatabaseLoader for FileBitDatabaseLoader {
    fn load(&self, path: &Path) -> DatabaseResult<TileBitDatabase> {
        let content = read_file(path)?;
        TileBitDatabase::parse(&content).map_err(|e| e.at_path(path))
    }
}

/// Hands out one shared [`TileBitDatabase`] per tile locator.
///
/// The lock is held across lookup, load and insert. Concurrent first
/// requests for any key are serialized behind it, which guarantees that
/// each key is loaded at most once and that every caller receives the same
/// `Arc`. Entries are never evicted.
pub struct TileBitDatabaseCache {
    loader: Box<dyn TileBitDatabaseLoader>,
    handles: Mutex<HashMap<TileLocator, Arc<TileBitDatabase>>>,
}

impl TileBitDatabaseCache {
    /// Creates an empty cache that loads through `loader`.
    pub fn new(loader: Box<dyn TileBitDatabaseLoader>) -> Self {
        Self {
            loader,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the shared database for `locator`, loading it from `path`
    /// on the first request.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error. Nothing is cached for a failed load.
    pub fn get_or_load(
        &self,
        locator: &TileLocator,
        path: &Path,
    ) -> DatabaseResult<Arc<TileBitDatabase>> {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(db) = handles.get(locator) {
            log::debug!("bit database cache hit for {locator}");
            return Ok(Arc::clone(db));
        }
        log::debug!("loading bit database for {locator} from {}", path.display());
        let db = Arc::new(self.loader.load(path)?);
        handles.insert(locator.clone(), Arc::clone(&db));
        Ok(db)
    }

    /// Returns the number of cached databases.
    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TileBitDatabaseCache {
    fn default() -> Self {
        Self::new(Box::new(FileBitDatabaseLoader))
    }
}

impl fmt::Debug for TileBitDatabaseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileBitDatabaseCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader(Arc<AtomicUsize>);

    impl TileBitDatabaseLoader for CountingLoader {
        fn load(&self, path: &Path) -> DatabaseResult<TileBitDatabase> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if path.ends_with("missing/bits.db") {
                return Err(DatabaseError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            Ok(TileBitDatabase::default())
        }
    }

    fn counting_cache() -> (Arc<AtomicUsize>, TileBitDatabaseCache) {
        let count = Arc::new(AtomicUsize::new(0));
        let cache = TileBitDatabaseCache::new(Box::new(CountingLoader(Arc::clone(&count))));
        (count, cache)
    }

    #[test]
    fn same_key_same_handle() {
        let (count, cache) = counting_cache();
        let loc = TileLocator::new("ECP5", "PLC2");
        let path = PathBuf::from("ECP5/tiledata/PLC2/bits.db");

        let a = cache.get_or_load(&loc, &path).unwrap();
        let b = cache.get_or_load(&loc, &path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_load_separately() {
        let (count, cache) = counting_cache();
        let path = PathBuf::from("bits.db");
        let a = cache
            .get_or_load(&TileLocator::new("ECP5", "PLC2"), &path)
            .unwrap();
        let b = cache
            .get_or_load(&TileLocator::new("MachXO2", "PLC2"), &path)
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failure_is_not_cached() {
        let (count, cache) = counting_cache();
        let loc = TileLocator::new("ECP5", "missing");
        let path = PathBuf::from("ECP5/tiledata/missing/bits.db");
        assert!(cache.get_or_load(&loc, &path).is_err());
        assert!(cache.get_or_load(&loc, &path).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn file_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileBitDatabaseLoader
            .load(&dir.path().join("bits.db"))
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Io { .. }));
    }

    #[test]
    fn file_loader_parse_error_has_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.db");
        std::fs::write(&path, ".nonsense\n").unwrap();
        match FileBitDatabaseLoader.load(&path).unwrap_err() {
            DatabaseError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_loader_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bits.db");
        std::fs::write(&path, ".fixed_conn A B\n").unwrap();
        let db = FileBitDatabaseLoader.load(&path).unwrap();
        assert_eq!(db.fixed_connections().len(), 1);
    }
}

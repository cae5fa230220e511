//! Render store: a persistent key to blob map with no expiry.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open the store.
    #[error("failed to open store: {0}")]
    Open(String),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem error.
    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored blob is not valid UTF-8.
    #[error("stored blob for '{0}' is not valid UTF-8")]
    Corrupt(String),
}

/// Status of a render cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Stored render served.
    Hit,
    /// Nothing stored; rendered fresh.
    Miss,
    /// Store unavailable; rendered fresh without caching.
    Error,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Key to rendered-blob store.
///
/// Writers do not coordinate: concurrent renders of one key are idempotent
/// and the last write wins.
pub trait RenderStore {
    /// Get a stored blob.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a blob, replacing any previous value.
    fn set(&self, key: &str, blob: &str) -> StoreResult<()>;

    /// Delete a blob. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;
}

impl<T: RenderStore + ?Sized> RenderStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, blob: &str) -> StoreResult<()> {
        (**self).set(key, blob)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }
}

/// In-memory store (for development/testing and single-process hosts).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl RenderStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, blob: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one file per key.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.html", file_name_for(key)))
    }
}

// Keys are arbitrary strings; encode anything outside a conservative set so
// distinct keys always land in distinct files.
fn file_name_for(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'_' => name.push(byte as char),
            _ => name.push_str(&format!("%{:02X}", byte)),
        }
    }
    name
}

impl RenderStore for FsStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(key.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, blob: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        let io_error = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        // Each writer gets its own temp file; the rename makes the last writer win.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        tmp.write_all(blob.as_bytes()).map_err(io_error)?;
        tmp.persist(&path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// Store backed by Spin's Key-Value Store.
#[cfg(target_arch = "wasm32")]
pub struct SpinStore {
    store: spin_sdk::key_value::Store,
}

#[cfg(target_arch = "wasm32")]
impl SpinStore {
    /// Open the default Key-Value store.
    pub fn open_default() -> StoreResult<Self> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| StoreError::Open(e.to_string()))?;
        Ok(Self { store })
    }

    /// Open a named Key-Value store.
    pub fn open(name: &str) -> StoreResult<Self> {
        let store =
            spin_sdk::key_value::Store::open(name).map_err(|e| StoreError::Open(e.to_string()))?;
        Ok(Self { store })
    }
}

#[cfg(target_arch = "wasm32")]
impl RenderStore for SpinStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.store.get(key) {
            Ok(Some(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::Corrupt(key.to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, blob: &str) -> StoreResult<()> {
        self.store
            .set(key, blob.as_bytes())
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.store
            .delete(key)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "<html>1</html>").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("<html>1</html>"));

        store.set("k", "<html>2</html>").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("<html>2</html>"));
        assert_eq!(store.len(), 1);

        store.delete("k").unwrap();
        assert!(store.is_empty());
        store.delete("k").unwrap();
    }

    #[test]
    fn test_in_memory_keys_sorted() {
        let store = InMemoryStore::new();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.contains("a"));
    }

    #[test]
    fn test_arc_store_delegates() {
        let store = Arc::new(InMemoryStore::new());
        let shared: Arc<InMemoryStore> = Arc::clone(&store);
        shared.set("x", "y").unwrap();
        assert!(store.contains("x"));
    }

    #[test]
    fn test_fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path().join("renders")).unwrap();

        assert_eq!(store.get("changelog:1:2.0:1.0.0").unwrap(), None);
        store.set("changelog:1:2.0:1.0.0", "<p>hi</p>").unwrap();
        assert_eq!(
            store.get("changelog:1:2.0:1.0.0").unwrap().as_deref(),
            Some("<p>hi</p>")
        );

        store.delete("changelog:1:2.0:1.0.0").unwrap();
        assert_eq!(store.get("changelog:1:2.0:1.0.0").unwrap(), None);
        store.delete("changelog:1:2.0:1.0.0").unwrap();
    }

    #[test]
    fn test_fs_store_concurrent_writers_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsStore::open(dir.path()).unwrap());
        let key = "changelog:1:1.0:1.0.0";

        let blob_for = |round: usize, writer: usize| format!("{}-{};", round, writer).repeat(64 * 1024);

        for round in 0..10 {
            let handles: Vec<_> = (0..8)
                .map(|writer| {
                    let store = Arc::clone(&store);
                    let blob = blob_for(round, writer);
                    std::thread::spawn(move || store.set(key, &blob))
                })
                .collect();

            for handle in handles {
                handle.join().unwrap().unwrap();
            }

            let stored = store.get(key).unwrap().unwrap();
            assert!((0..8).any(|writer| stored == blob_for(round, writer)));
        }

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_fs_file_names_are_distinct() {
        assert_ne!(file_name_for("a:b"), file_name_for("a_b"));
        assert_eq!(file_name_for("changelog:1"), "changelog%3A1");
        assert!(!file_name_for("../etc/passwd").contains('/'));
    }

    #[test]
    fn test_cache_status_display() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::Miss.to_string(), "MISS");
        assert_eq!(CacheStatus::Error.to_string(), "ERROR");
    }
}

//! File-based store for native platforms.

use super::store::{BoxFuture, Store, StoreError, StoreResult};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// File-based store.
///
/// Keeps one file per key in a directory.
pub struct FileStore {
    /// Base directory for stored values.
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new file store with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| StoreError::Io(format!("Failed to create storage directory: {}", e)))?;
        }
        Ok(Self { base_path })
    }

    /// Create a file store in the default location.
    ///
    /// On Unix: `~/.local/share/mirrorink/library/`
    /// On Windows: `%LOCALAPPDATA%\mirrorink\library\`
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StoreError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("mirrorink").join("library"))
    }

    /// File path for a key.
    fn value_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, StoreResult<Option<Vec<u8>>>> {
        let path = self.value_path(key);
        Box::pin(async move {
            match fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StoreError::Io(format!("Failed to read {}: {}", path.display(), e))),
            }
        })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, StoreResult<()>> {
        let path = self.value_path(key);
        Box::pin(async move {
            fs::write(&path, value).map_err(|e| match e.kind() {
                ErrorKind::StorageFull => StoreError::QuotaExceeded,
                _ => StoreError::Io(format!("Failed to write {}: {}", path.display(), e)),
            })
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, StoreResult<()>> {
        let path = self.value_path(key);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| StoreError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_set_get() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.set("library", b"[]".to_vec())).unwrap();
        assert_eq!(block_on(store.get("library")).unwrap(), Some(b"[]".to_vec()));
        assert!(dir.path().join("library.json").exists());
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(block_on(store.get("nonexistent")).unwrap(), None);
    }

    #[test]
    fn test_file_store_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(nested.clone()).unwrap();
        assert_eq!(store.base_path(), &nested);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_file_store_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.set("k", vec![1, 2, 3])).unwrap();
        block_on(store.remove("k")).unwrap();
        assert_eq!(block_on(store.get("k")).unwrap(), None);
        block_on(store.remove("k")).unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.set("a/b:c*d", vec![7])).unwrap();
        assert_eq!(block_on(store.get("a/b:c*d")).unwrap(), Some(vec![7]));
        assert!(dir.path().join("a_b_c_d.json").exists());
    }
}

//! Durable string key-value storage backing the credential and session stores.
//!
//! Every mutation is expressed as a batch of [`StorageOp`]s so a store can
//! apply several keys at once without a reader ever seeing a partial state.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Set(String, String),
    Remove(String),
}

impl StorageOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set(key.into(), value.into())
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove(key.into())
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Reads several keys under one lock; values come back in `keys` order.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Applies all operations in order as one unit.
    fn write_batch(&self, ops: Vec<StorageOp>) -> Result<(), StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_batch(vec![StorageOp::set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.write_batch(vec![StorageOp::remove(key)])
    }

    fn remove_many(&self, keys: &[String]) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.write_batch(keys.iter().cloned().map(StorageOp::Remove).collect())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}

fn read(map: &BTreeMap<String, String>, keys: &[&str]) -> Vec<Option<String>> {
    keys.iter().map(|key| map.get(*key).cloned()).collect()
}

fn apply(map: &mut BTreeMap<String, String>, ops: Vec<StorageOp>) {
    for op in ops {
        match op {
            StorageOp::Set(key, value) => {
                map.insert(key, value);
            }
            StorageOp::Remove(key) => {
                map.remove(&key);
            }
        }
    }
}

type Entries = BTreeMap<String, String>;

fn lock(entries: &Mutex<Entries>) -> Result<MutexGuard<'_, Entries>, StorageError> {
    entries.lock().map_err(|_| StorageError::Poisoned)
}

/// In-process store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        Ok(read(&*lock(&self.entries)?, keys))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.entries)?.keys().cloned().collect())
    }

    fn write_batch(&self, ops: Vec<StorageOp>) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries)?;
        apply(&mut entries, ops);
        Ok(())
    }
}

/// JSON object on disk. Each batch rewrites the file through a temp file
/// and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened file store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        Ok(read(&*lock(&self.entries)?, keys))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.entries)?.keys().cloned().collect())
    }

    fn write_batch(&self, ops: Vec<StorageOp>) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries)?;
        let mut next = entries.clone();
        apply(&mut next, ops);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_applies_batches_in_order() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                StorageOp::set("a", "1"),
                StorageOp::set("b", "2"),
                StorageOp::remove("a"),
            ])
            .unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn get_many_keeps_key_order() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![StorageOp::set("token", "a"), StorageOp::set("refreshToken", "r")])
            .unwrap();
        assert_eq!(
            store.get_many(&["refreshToken", "missing", "token"]).unwrap(),
            vec![Some("r".to_string()), None, Some("a".to_string())]
        );
    }

    #[test]
    fn keys_with_prefix_filters() {
        let store = MemoryStore::new();
        store.set("checkins_cache_1_2", "[]").unwrap();
        store.set("checkins_cache_1_3", "[]").unwrap();
        store.set("token", "t").unwrap();
        let keys = store.keys_with_prefix("checkins_cache_").unwrap();
        assert_eq!(keys, vec!["checkins_cache_1_2", "checkins_cache_1_3"]);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("tikit.json");
        {
            let store = FileStore::open(&path).unwrap();
            store.set("token", "abc").unwrap();
            store.set("refreshToken", "def").unwrap();
            store.remove("refreshToken").unwrap();
        }
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("refreshToken").unwrap(), None);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StorageError::Serialization(_))));
    }
}

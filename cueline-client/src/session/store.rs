use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use ron::ser::PrettyConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not access session file: {0}")]
    Io(#[from] io::Error),
    #[error("Session file is corrupt: {0}")]
    Format(String),
}

/// Durable string storage, keyed by fixed names
pub trait KeyValueStore
where
    Self: 'static + Send + Sync,
{
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Keeps values for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

/// Keeps values in a RON file, which is rewritten on every change
#[derive(Debug)]
pub struct RonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

impl RonFileStore {
    /// Opens the store, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(data) => ron::from_str(&data).map_err(|e| StoreError::Format(e.to_string()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes to a sibling file first, so a crash never leaves a half written file behind
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let data = ron::ser::to_string_pretty(entries, PrettyConfig::default())
            .map_err(|e| StoreError::Format(e.to_string()))?;

        let temporary = self.path.with_extension("tmp");
        fs::write(&temporary, data)?;
        fs::rename(&temporary, &self.path)?;

        Ok(())
    }
}

impl KeyValueStore for RonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();

        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());

        self.persist(&next)?;
        *entries = next;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();

        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);

        self.persist(&next)?;
        *entries = next;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{env, process};

    use super::*;

    fn temporary_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("cueline-{}-{}.ron", name, process::id()))
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_ron_file_store_survives_reopen() {
        let path = temporary_path("reopen");
        let _ = fs::remove_file(&path);

        let store = RonFileStore::open(&path).unwrap();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "abc").unwrap();
        store.set("refreshToken", "def").unwrap();
        store.remove("token").unwrap();

        let reopened = RonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("token").unwrap(), None);
        assert_eq!(reopened.get("refreshToken").unwrap().as_deref(), Some("def"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_ron_file_store_rejects_corrupt_file() {
        let path = temporary_path("corrupt");
        fs::write(&path, "{ this is not ron").unwrap();

        assert!(matches!(
            RonFileStore::open(&path),
            Err(StoreError::Format(_))
        ));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_entries_unchanged() {
        let directory = env::temp_dir().join(format!("cueline-vanishing-{}", process::id()));
        fs::create_dir_all(&directory).unwrap();

        let store = RonFileStore::open(directory.join("session.ron")).unwrap();
        store.set("token", "abc").unwrap();

        fs::remove_dir_all(&directory).unwrap();

        assert!(matches!(store.set("refreshToken", "def"), Err(StoreError::Io(_))));
        assert_eq!(store.get("refreshToken").unwrap(), None);

        assert!(matches!(store.remove("token"), Err(StoreError::Io(_))));
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
    }
}

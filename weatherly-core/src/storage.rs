//! Durable key-value records.
//!
//! Each logical record (favorites, theme) is a single JSON blob stored under a
//! fixed key and fully rewritten on every save. Last write wins.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use directories::ProjectDirs;

use crate::error::{Result, WeatherError};

pub const FAVORITES_KEY: &str = "favorites";
pub const THEME_KEY: &str = "theme";

pub trait KeyValueStore: Send + Sync + Debug {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per record inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the platform data directory.
    pub fn default_location() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "weatherly", "weatherly")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;
        Ok(Self::new(dirs.data_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(WeatherError::storage(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            WeatherError::storage(format!(
                "failed to create data directory {}: {err}",
                self.dir.display()
            ))
        })?;

        let path = self.record_path(key);
        let tmp = path.with_extension("json.tmp");

        // Rename over the old file so readers see either the old or new blob.
        if let Err(err) = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path)) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), error = %cleanup, "temp record not removed");
            }
            return Err(WeatherError::storage(format!(
                "failed to write {}: {err}",
                path.display()
            )));
        }

        tracing::debug!(key, path = %path.display(), "record saved");
        Ok(())
    }
}

/// In-memory store; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let records = self
            .records
            .lock()
            .map_err(|_| WeatherError::storage("memory store lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| WeatherError::storage("memory store lock poisoned"))?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.read(FAVORITES_KEY).unwrap(), None);
    }

    #[test]
    fn write_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("data"));

        store.write(THEME_KEY, "{\"a\":1}").unwrap();
        store.write(THEME_KEY, "{\"a\":2}").unwrap();

        assert_eq!(store.read(THEME_KEY).unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(!store.dir().join("theme.json.tmp").exists());
    }

    #[test]
    fn unwritable_directory_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let store = FileStore::new(blocker.join("data"));
        let err = store.write(FAVORITES_KEY, "[]").unwrap_err();
        assert!(matches!(err, WeatherError::StorageUnavailable(_)));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // A non-empty directory where the record should go cannot be replaced.
        let occupied = dir.path().join("favorites.json");
        fs::create_dir(&occupied).unwrap();
        fs::write(occupied.join("keep"), "x").unwrap();

        let err = store.write(FAVORITES_KEY, "[]").unwrap_err();
        assert!(matches!(err, WeatherError::StorageUnavailable(_)));
        assert!(!dir.path().join("favorites.json.tmp").exists());
    }

    #[test]
    fn memory_store_clones_share_records() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write(FAVORITES_KEY, "[]").unwrap();
        assert_eq!(other.read(FAVORITES_KEY).unwrap().as_deref(), Some("[]"));
    }
}

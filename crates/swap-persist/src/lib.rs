//! # swap-persist
//!
//! JSON snapshot persistence for SkillSwap state.
//!
//! A [`JsonStore`] owns one file, `<dir>/<name>.json`. Callers keep their
//! state in memory and hand the whole value to [`JsonStore::save`] after each
//! mutation. Writes go to a temporary file first and are renamed into place,
//! so a crash mid-write never leaves a truncated snapshot behind.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while reading or writing a snapshot.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("snapshot io error at {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot json error at {path}: {source}")]
    Json {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;

/// A single named JSON snapshot file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Creates a store for `<dir>/<name>.json`. Nothing touches the disk yet.
    #[must_use]
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            path: dir.join(format!("{name}.json")),
        }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a snapshot has been written.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the snapshot, falling back to `T::default()` when it is missing
    /// or unreadable. Unreadable snapshots are logged.
    pub fn load<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable snapshot");
                T::default()
            }
        }
    }

    /// Loads the snapshot, returning `Ok(None)` when no file exists.
    pub fn try_load<T>(&self) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let value = serde_json::from_slice(&raw).map_err(|source| PersistError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), bytes = raw.len(), "loaded snapshot");
        Ok(Some(value))
    }

    /// Writes the snapshot atomically, creating the parent directory if needed.
    pub fn save<T>(&self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let encoded = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &encoded).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), bytes = encoded.len(), "saved snapshot");
        Ok(())
    }

    /// Deletes the snapshot. A missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path(), "nothing");
        let loaded: HashMap<String, u32> = store.load();
        assert!(loaded.is_empty());
        assert!(!store.exists());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path(), "counts");

        let mut counts = HashMap::new();
        counts.insert("alice".to_string(), 3_u32);
        store.save(&counts).expect("save");

        assert!(store.exists());
        let loaded: HashMap<String, u32> = store.load();
        assert_eq!(loaded.get("alice"), Some(&3));
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        let store = JsonStore::new(&nested, "state");
        store.save(&vec![1, 2, 3]).expect("save");
        assert!(nested.join("state.json").is_file());
        assert!(!nested.join("state.json.tmp").exists());
    }

    #[test]
    fn corrupt_snapshot_is_an_error_for_try_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path(), "bad");
        fs::write(store.path(), b"{not json").expect("write");

        let strict: Result<Option<Vec<u8>>> = store.try_load();
        assert!(matches!(strict, Err(PersistError::Json { .. })));

        let lenient: Vec<u8> = store.load();
        assert!(lenient.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path(), "gone");
        store.save(&1_u8).expect("save");
        store.remove().expect("remove");
        store.remove().expect("remove again");
        assert!(!store.exists());
    }
}

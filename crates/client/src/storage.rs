//! Durable key-value storage.
//!
//! Holds the handful of named entries the client persists between runs
//! (`jwt`, `cart`). Entries may carry an expiry; an expired entry reads as
//! absent and is purged on read.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Entry lifetime is not positive or overflows the clock.
    #[error("Invalid entry lifetime: {0}")]
    InvalidExpiry(chrono::Duration),
}

/// Named string entries with optional expiry.
pub trait Storage: Send + Sync {
    /// Read an entry. Missing and expired entries both return `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Write an entry, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;

    /// Delete an entry. Deleting a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// A stored value and its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// Process-lifetime storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(name) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                entries.remove(name);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                StoredEntry {
                    value: value.to_string(),
                    expires_at,
                },
            );
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// Storage backed by a single JSON document on disk.
///
/// The document is re-read on every access so separate processes sharing
/// the file observe each other's writes. Writes go to a sibling temp file
/// that is then renamed over the original.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

type Document = BTreeMap<String, StoredEntry>;

impl FileStorage {
    /// Storage at `path`. The file and its parent directory are created on
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<Document, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Document::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, document: &Document) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let encoded = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| self.io_error(e))?;
        file.write_all(&encoded).map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), entries = document.len(), "Storage written");
        Ok(())
    }

    /// Load, apply `f`, and save if `f` reports a change.
    fn update(&self, f: impl FnOnce(&mut Document) -> bool) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.load()?;
        if f(&mut document) {
            self.save(&document)?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let document = self.load()?;
        let Some(entry) = document.get(name) else {
            return Ok(None);
        };
        if !entry.is_expired(Utc::now()) {
            return Ok(Some(entry.value.clone()));
        }

        debug!(name, "Purging expired storage entry");
        if let Err(e) = self.update(|doc| {
            // Another writer may have refreshed the entry since we read it.
            let expired = doc.get(name).is_some_and(|e| e.is_expired(Utc::now()));
            if expired {
                doc.remove(name);
            }
            expired
        }) {
            warn!(name, error = %e, "Failed to purge expired storage entry");
        }
        Ok(None)
    }

    fn set(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.insert(
                name.to_string(),
                StoredEntry {
                    value: value.to_string(),
                    expires_at,
                },
            );
            true
        })
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.update(|doc| doc.remove(name).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn past() -> DateTime<Utc> {
        Utc::now() - chrono::Duration::minutes(5)
    }

    fn future() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(1)
    }

    fn exercise(storage: &dyn Storage) {
        assert_eq!(storage.get("jwt").unwrap(), None);

        storage.set("jwt", "abc", Some(future())).unwrap();
        assert_eq!(storage.get("jwt").unwrap().as_deref(), Some("abc"));

        storage.set("jwt", "def", None).unwrap();
        assert_eq!(storage.get("jwt").unwrap().as_deref(), Some("def"));

        storage.remove("jwt").unwrap();
        assert_eq!(storage.get("jwt").unwrap(), None);
        storage.remove("jwt").unwrap();

        storage.set("jwt", "stale", Some(past())).unwrap();
        assert_eq!(storage.get("jwt").unwrap(), None);
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileStorage::new(dir.path().join("nested/storage.json")));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        FileStorage::new(&path).set("cart", "{}", None).unwrap();
        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("cart").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_storage_purges_expired_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));
        storage.set("jwt", "old", Some(past())).unwrap();
        storage.set("cart", "{}", None).unwrap();

        assert_eq!(storage.get("jwt").unwrap(), None);
        let raw = fs::read_to_string(storage.path()).unwrap();
        assert!(!raw.contains("\"jwt\""));
        assert!(raw.contains("\"cart\""));
    }

    #[test]
    fn test_file_storage_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStorage::new(&path).get("jwt").unwrap_err();
        assert!(matches!(err, StorageError::Serialize(_)));
    }
}

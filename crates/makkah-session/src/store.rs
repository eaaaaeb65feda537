//! Persisted key-value slots shared by the identity provider and the session holder.
//!
//! # Design
//! - Mirrors browser local storage: string slots, synchronous access.
//! - The file store keeps an in-memory copy and rewrites the whole document
//!   through a temp file plus rename; readers never see a partial document.
//! - A corrupt document is logged and treated as empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Slot holding the last minted bearer credential.
pub const CREDENTIAL_SLOT: &str = "token";
/// Slot holding the provider's persisted user record.
pub const IDENTITY_SLOT: &str = "identity";

const STORE_FILE: &str = "session.json";

/// String slots persisted across process runs.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot.
    fn get(&self, slot: &str) -> Option<String>;

    /// Write a slot.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be persisted.
    fn set(&self, slot: &str, value: &str) -> StoreResult<()>;

    /// Remove a slot; removing an absent slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the removal cannot be persisted.
    fn remove(&self, slot: &str) -> StoreResult<()>;
}

/// In-process store used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, slot: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slot)
            .cloned()
    }

    fn set(&self, slot: &str, value: &str) -> StoreResult<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> StoreResult<()> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(slot);
        Ok(())
    }
}

/// JSON document under the state directory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or the existing
    /// document cannot be read.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            operation: "store.create_dir",
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(STORE_FILE);
        let slots = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                operation: "store.read",
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "discarding corrupt session store");
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> StoreResult<()> {
        let encoded =
            serde_json::to_vec_pretty(slots).map_err(|source| StoreError::Encode { source })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|source| StoreError::Io {
            operation: "store.write",
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Io {
            operation: "store.rename",
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, slot: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slot)
            .cloned()
    }

    fn set(&self, slot: &str, value: &str) -> StoreResult<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(slot.to_string(), value.to_string());
        self.persist(&slots)
    }

    fn remove(&self, slot: &str) -> StoreResult<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.remove(slot).is_none() {
            return Ok(());
        }
        self.persist(&slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_slots() {
        let store = MemoryStore::new();
        assert!(store.get(CREDENTIAL_SLOT).is_none());
        store.set(CREDENTIAL_SLOT, "abc").expect("set");
        assert_eq!(store.get(CREDENTIAL_SLOT).as_deref(), Some("abc"));
        store.remove(CREDENTIAL_SLOT).expect("remove");
        store.remove(CREDENTIAL_SLOT).expect("remove absent");
        assert!(store.get(CREDENTIAL_SLOT).is_none());
    }

    #[test]
    fn file_store_survives_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        {
            let store = FileStore::open(dir.path())?;
            store.set(CREDENTIAL_SLOT, "token-1")?;
            store.set(IDENTITY_SLOT, "{}")?;
            store.remove(IDENTITY_SLOT)?;
        }
        let reopened = FileStore::open(dir.path())?;
        assert_eq!(reopened.get(CREDENTIAL_SLOT).as_deref(), Some("token-1"));
        assert!(reopened.get(IDENTITY_SLOT).is_none());
        assert!(!dir.path().join("session.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn corrupt_document_opens_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(STORE_FILE), "not json")?;
        let store = FileStore::open(dir.path())?;
        assert!(store.get(CREDENTIAL_SLOT).is_none());
        store.set(CREDENTIAL_SLOT, "fresh")?;
        assert_eq!(
            FileStore::open(dir.path())?.get(CREDENTIAL_SLOT).as_deref(),
            Some("fresh")
        );
        Ok(())
    }
}

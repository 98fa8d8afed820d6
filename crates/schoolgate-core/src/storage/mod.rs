//! Client-local durable key/value storage.
//!
//! The session store persists its two entries through a `KeyValueStore`.
//! Three backends are provided:
//! - `FileStore`: one file per key under the app data directory
//! - `KeyringStore`: entries in the OS keychain
//! - `MemoryStore`: process-local, for tests and as a last-resort fallback

pub mod file;
pub mod keyring;
pub mod memory;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use self::file::FileStore;
pub use self::keyring::KeyringStore;
pub use self::memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] ::keyring::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Which backend to persist the session in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl std::str::FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keyring" => Ok(StorageKind::Keyring),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Open the configured backend.
///
/// A backend that cannot be opened degrades to an in-memory store: the
/// user simply stays signed in for this process only.
pub fn open_store(kind: StorageKind, data_dir: &Path) -> Box<dyn KeyValueStore> {
    match kind {
        StorageKind::File => match FileStore::new(data_dir) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(error = %e, dir = %data_dir.display(), "File storage unavailable, using memory");
                Box::new(MemoryStore::new())
            }
        },
        StorageKind::Keyring => Box::new(KeyringStore::new()),
        StorageKind::Memory => Box::new(MemoryStore::new()),
    }
}

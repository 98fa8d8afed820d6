use keyring::Entry;

use super::{KeyValueStore, StorageError};

/// Keychain service name the entries are filed under.
const SERVICE_NAME: &str = "schoolgate";

/// Stores entries in the OS keychain, one credential per key: the macOS
/// keychain, the Windows credential manager, or the Linux kernel keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_os_keychain() {
        let store = KeyringStore::with_service("schoolgate-test-round-trip");
        if let Err(e) = store.set("schoolgate.token", "t1") {
            eprintln!("skipping: no usable keychain here ({})", e);
            return;
        }

        assert_eq!(store.get("schoolgate.token").unwrap().as_deref(), Some("t1"));
        // A fresh handle sees the same entry
        let other = KeyringStore::with_service("schoolgate-test-round-trip");
        assert_eq!(other.get("schoolgate.token").unwrap().as_deref(), Some("t1"));

        store.remove("schoolgate.token").unwrap();
        assert_eq!(store.get("schoolgate.token").unwrap(), None);
        store.remove("schoolgate.token").unwrap();
    }
}

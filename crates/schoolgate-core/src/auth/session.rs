//! Persisted session record.
//!
//! The record is two entries in a `KeyValueStore`: the bearer token and the
//! JSON-serialized user. Both exist together or neither does.

use tracing::{debug, warn};

use crate::models::{Session, User};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "schoolgate.token";

/// Storage key for the serialized user record
pub const USER_KEY: &str = "schoolgate.user";

pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the persisted session.
    ///
    /// A half-present record or a user entry that does not parse is purged
    /// and reported as no session. An unreadable backend is also reported as
    /// no session.
    pub fn load(&self) -> Option<Session> {
        let token = self.read(TOKEN_KEY)?;
        let user_json = self.read(USER_KEY)?;

        match (token, user_json) {
            (None, None) => None,
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) if !token.is_empty() => {
                    debug!(user_id = user.id, role = %user.role_type, "Session loaded");
                    Some(Session { token, user })
                }
                Ok(_) => {
                    warn!("Persisted token is empty, purging session");
                    self.purge();
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Persisted user is corrupt, purging session");
                    self.purge();
                    None
                }
            },
            _ => {
                warn!("Persisted session is incomplete, purging");
                self.purge();
                None
            }
        }
    }

    /// Persist the session.
    ///
    /// Either both entries are written or the store is restored to what it
    /// held before the call.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| StorageError::Unavailable(format!("failed to serialize user: {}", e)))?;

        let previous_token = self.backend.get(TOKEN_KEY)?;
        let previous_user = self.backend.get(USER_KEY)?;

        if let Err(e) = self.backend.set(TOKEN_KEY, &session.token) {
            self.restore(TOKEN_KEY, previous_token.as_deref());
            return Err(e);
        }
        if let Err(e) = self.backend.set(USER_KEY, &user_json) {
            self.restore(TOKEN_KEY, previous_token.as_deref());
            self.restore(USER_KEY, previous_user.as_deref());
            return Err(e);
        }

        debug!(user_id = session.user.id, "Session saved");
        Ok(())
    }

    /// Remove both entries.
    pub fn clear(&self) -> Result<(), StorageError> {
        let token = self.backend.remove(TOKEN_KEY);
        let user = self.backend.remove(USER_KEY);
        token.and(user)
    }

    /// Read one entry; `None` means the backend itself failed.
    fn read(&self, key: &str) -> Option<Option<String>> {
        match self.backend.get(key) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, key, "Session storage unreadable");
                None
            }
        }
    }

    fn purge(&self) {
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to purge session storage");
        }
    }

    fn restore(&self, key: &str, previous: Option<&str>) {
        let result = match previous {
            Some(value) => self.backend.set(key, value),
            None => self.backend.remove(key),
        };
        if let Err(e) = result {
            warn!(error = %e, key, "Failed to roll back session entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::json;

    use super::*;
    use crate::models::Role;
    use crate::storage::MemoryStore;

    fn session(token: &str) -> Session {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "username": "admin",
            "role_type": "admin",
            "email": "admin@school.test"
        }))
        .unwrap();
        Session::new(token, user)
    }

    /// Delegates to a memory store but can be told to fail writes to one key.
    struct FlakyStore {
        inner: MemoryStore,
        fail_key: &'static str,
        failing: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) && key == self.fail_key {
                return Err(StorageError::Unavailable("disk full".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    /// Every call fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("locked".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("locked".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("locked".to_string()))
        }
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = SessionStore::new(MemoryStore::new());
        let original = session("t1");
        store.save(&original).unwrap();

        let loaded = store.load().expect("session should load");
        assert_eq!(loaded, original);
        assert_eq!(loaded.role(), Role::Admin);
    }

    #[test]
    fn test_load_empty_store() {
        let store = SessionStore::new(MemoryStore::new());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_user_is_purged() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(TOKEN_KEY, "t1").unwrap();
        backend.set(USER_KEY, "{not json").unwrap();

        let store = SessionStore::new(backend.clone());
        assert!(store.load().is_none());
        assert!(store.load().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_half_record_is_purged() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(TOKEN_KEY, "t1").unwrap();

        let store = SessionStore::new(backend.clone());
        assert!(store.load().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone());
        store.save(&session("t1")).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_failed_save_leaves_previous_record() {
        let backend = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_key: USER_KEY,
            failing: AtomicBool::new(false),
        });
        let store = SessionStore::new(backend.clone());
        store.save(&session("old")).unwrap();

        backend.failing.store(true, Ordering::SeqCst);
        assert!(store.save(&session("new")).is_err());

        let loaded = store.load().expect("previous session kept");
        assert_eq!(loaded.token, "old");
    }

    #[test]
    fn test_failed_first_save_leaves_nothing() {
        let backend = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_key: USER_KEY,
            failing: AtomicBool::new(true),
        });
        let store = SessionStore::new(backend.clone());
        assert!(store.save(&session("t1")).is_err());
        assert!(backend.inner.is_empty());
    }

    #[test]
    fn test_unavailable_storage_is_no_session() {
        let store = SessionStore::new(BrokenStore);
        assert!(store.load().is_none());
        assert!(store.save(&session("t1")).is_err());
        assert!(store.clear().is_err());
    }
}

//! Per-tab PKCE storage
//!
//! [`SessionStorage`] is the host's origin-scoped key/value store.
//! [`PkceStore`] layers the create-then-single-consume discipline on top:
//! one live entry per `state`, removed by whoever consumes the callback.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::error::{AuthError, AuthResult, CsrfReason};
use super::pkce::state_prefix;
use super::types::PkceEntry;

const KEY_PREFIX: &str = "webgate.pkce.";

/// Origin-scoped, session-lifetime string storage provided by the host
pub trait SessionStorage: Send + Sync {
    /// Read a value
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the host refuses the write (quota,
    /// private browsing).
    fn set_item(&self, key: &str, value: &str) -> AuthResult<()>;

    /// Remove a value; removing a missing key is a no-op
    fn remove_item(&self, key: &str);

    /// Read and remove a value
    ///
    /// Implementations backed by a concurrent map should override this to
    /// make the read and removal a single step.
    fn take_item(&self, key: &str) -> Option<String> {
        let value = self.get_item(key);
        if value.is_some() {
            self.remove_item(key);
        }
        value
    }
}

/// In-process [`SessionStorage`]
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: DashMap<String, String>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> AuthResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.remove(key);
    }

    fn take_item(&self, key: &str) -> Option<String> {
        self.items.remove(key).map(|(_, v)| v)
    }
}

/// PKCE entries keyed by `state`
///
/// Shared by the silent controller, the interactive controller and the
/// bootstrap; cheap to clone.
#[derive(Clone)]
pub struct PkceStore {
    storage: Arc<dyn SessionStorage>,
}

impl PkceStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Store backed by a fresh [`MemorySessionStorage`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    fn key(state: &str) -> String {
        format!("{KEY_PREFIX}{state}")
    }

    /// Save the entry for a new attempt
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if an entry for `state` already exists or
    /// the host refuses the write.
    pub fn save(&self, state: &str, entry: &PkceEntry) -> AuthResult<()> {
        let key = Self::key(state);
        if self.storage.get_item(&key).is_some() {
            return Err(AuthError::Storage(format!(
                "entry for state {} already exists",
                state_prefix(state)
            )));
        }
        let json = serde_json::to_string(entry)
            .map_err(|e| AuthError::Storage(format!("failed to encode entry: {e}")))?;
        self.storage.set_item(&key, &json)?;
        debug!(state_prefix = state_prefix(state), "PKCE entry stored");
        Ok(())
    }

    /// Remove and return the entry for `state`
    ///
    /// The entry is gone after this call whether or not decoding succeeds.
    ///
    /// # Errors
    /// Returns `CsrfOrExpiry(PkceDataNotFound)` if no entry exists, and
    /// `AuthError::Storage` if the stored value is corrupt.
    pub fn consume(&self, state: &str) -> AuthResult<PkceEntry> {
        let raw = self
            .storage
            .take_item(&Self::key(state))
            .ok_or(AuthError::csrf(CsrfReason::PkceDataNotFound))?;
        debug!(state_prefix = state_prefix(state), "PKCE entry consumed");
        serde_json::from_str(&raw)
            .map_err(|e| AuthError::Storage(format!("corrupt PKCE entry: {e}")))
    }

    /// Drop the entry for an abandoned attempt
    pub fn discard(&self, state: &str) {
        self.storage.remove_item(&Self::key(state));
    }

    /// True while an entry for `state` is live
    #[must_use]
    pub fn contains(&self, state: &str) -> bool {
        self.storage.get_item(&Self::key(state)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> PkceEntry {
        PkceEntry { verifier: "v".repeat(64), challenge: "c".repeat(43) }
    }

    #[test]
    fn test_save_then_consume() {
        let store = PkceStore::in_memory();
        store.save("state-1", &entry()).expect("saved");
        assert!(store.contains("state-1"));

        let consumed = store.consume("state-1").expect("present");
        assert_eq!(consumed, entry());
        assert!(!store.contains("state-1"));
    }

    #[test]
    fn test_entries_are_single_use() {
        let store = PkceStore::in_memory();
        store.save("state-1", &entry()).expect("saved");
        store.consume("state-1").expect("first consume");

        let second = store.consume("state-1");
        assert!(matches!(
            second,
            Err(AuthError::CsrfOrExpiry { reason: CsrfReason::PkceDataNotFound })
        ));
    }

    #[test]
    fn test_unknown_state_is_csrf_error() {
        let store = PkceStore::in_memory();
        assert!(matches!(store.consume("never-stored"), Err(AuthError::CsrfOrExpiry { .. })));
    }

    #[test]
    fn test_duplicate_save_rejected() {
        let store = PkceStore::in_memory();
        store.save("dup", &entry()).expect("saved");
        assert!(matches!(store.save("dup", &entry()), Err(AuthError::Storage(_))));
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set_item("webgate.pkce.bad", "not json").expect("set");
        let store = PkceStore::new(storage.clone());

        assert!(matches!(store.consume("bad"), Err(AuthError::Storage(_))));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_discard_and_isolation() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = PkceStore::new(storage.clone());
        store.save("a", &entry()).expect("saved");
        store.save("b", &entry()).expect("saved");

        store.discard("a");
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert_eq!(storage.len(), 1);
    }
}

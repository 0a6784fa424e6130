//! Secure at-rest storage for the native bearer token.
//!
//! Every call opens and releases its own storage handle. Failures are logged
//! and read back as "no value"; callers cannot tell a missing token from a
//! broken store.

use std::collections::HashMap;
use std::sync::Mutex;

/// Platform key/value store for the native session token.
///
/// Web builds have no implementation; the session branches around it.
pub trait TokenStore: Send + Sync + 'static {
    fn save_token(&self, key: &str, value: &str);

    fn get_token(&self, key: &str) -> Option<String>;

    fn delete_token(&self, key: &str);
}

/// Process-local store. Used in tests and on targets without a keychain.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry.
    #[must_use]
    pub fn with_token(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save_token(&self, key: &str, value: &str) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_owned(), value.to_owned());
            }
            Err(e) => tracing::warn!(error = %e, key, "Token store lock poisoned on save"),
        }
    }

    fn get_token(&self, key: &str) -> Option<String> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                tracing::warn!(error = %e, key, "Token store lock poisoned on read");
                None
            }
        }
    }

    fn delete_token(&self, key: &str) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.remove(key);
            }
            Err(e) => tracing::warn!(error = %e, key, "Token store lock poisoned on delete"),
        }
    }
}

/// OS keychain store (macOS Keychain, Windows Credential Manager, Secret Service).
#[cfg(feature = "keyring")]
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeyringTokenStore {
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> keyring::Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
    }
}

#[cfg(feature = "keyring")]
impl TokenStore for KeyringTokenStore {
    fn save_token(&self, key: &str, value: &str) {
        if let Err(e) = self.entry(key).and_then(|entry| entry.set_password(value)) {
            tracing::warn!(error = %e, key, "Failed to save token to keychain");
        }
    }

    fn get_token(&self, key: &str) -> Option<String> {
        match self.entry(key).and_then(|entry| entry.get_password()) {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!(error = %e, key, "Failed to read token from keychain");
                None
            }
        }
    }

    fn delete_token(&self, key: &str) {
        match self.entry(key).and_then(|entry| entry.delete_credential()) {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => tracing::warn!(error = %e, key, "Failed to delete token from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_get_delete() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get_token("accessToken"), None);

        store.save_token("accessToken", "a.b.c");
        assert_eq!(store.get_token("accessToken").as_deref(), Some("a.b.c"));

        store.save_token("accessToken", "d.e.f");
        assert_eq!(store.get_token("accessToken").as_deref(), Some("d.e.f"));

        store.delete_token("accessToken");
        assert_eq!(store.get_token("accessToken"), None);
    }

    #[test]
    fn delete_missing_is_noop() {
        let store = MemoryTokenStore::with_token("other", "x");
        store.delete_token("accessToken");
        assert_eq!(store.get_token("other").as_deref(), Some("x"));
    }
}

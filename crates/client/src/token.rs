//! Auth token store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::storage::{Storage, StorageError};

/// Storage entry name for the bearer token.
pub const TOKEN_KEY: &str = "jwt";

/// Persists the bearer token with an expiry.
///
/// There is no in-memory copy: every read goes to storage, so an expired
/// token reads as absent.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    ttl: chrono::Duration,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Token store over `storage`; `ttl` is the default token lifetime.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, ttl: chrono::Duration) -> Self {
        Self { storage, ttl }
    }

    /// Current token, if one is stored and unexpired.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn get(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self.storage.get(TOKEN_KEY)?.map(SecretString::from))
    }

    /// Store a token that expires at `expires_at` (`None` never expires).
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn set(
        &self,
        token: &SecretString,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        debug!(expires_at = ?expires_at, "Storing auth token");
        self.storage
            .set(TOKEN_KEY, token.expose_secret(), expires_at)
    }

    /// Store a token with the default lifetime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidExpiry` if the lifetime is not positive or the expiry
    /// falls outside the representable range, or an error if storage cannot
    /// be written.
    pub fn set_with_default_expiry(&self, token: &SecretString) -> Result<(), StorageError> {
        if self.ttl <= chrono::Duration::zero() {
            return Err(StorageError::InvalidExpiry(self.ttl));
        }
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(StorageError::InvalidExpiry(self.ttl))?;
        self.set(token, Some(expires_at))
    }

    /// Delete the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn remove(&self) -> Result<(), StorageError> {
        debug!("Removing auth token");
        self.storage.remove(TOKEN_KEY)
    }

    /// Whether a usable token is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, StorageError> {
        Ok(self.get()?.is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStorage::new()), chrono::Duration::days(7))
    }

    #[test]
    fn test_set_get_remove() {
        let tokens = store();
        assert!(!tokens.is_authenticated().unwrap());

        tokens
            .set_with_default_expiry(&SecretString::from("jwt-value"))
            .unwrap();
        assert_eq!(tokens.get().unwrap().unwrap().expose_secret(), "jwt-value");
        assert!(tokens.is_authenticated().unwrap());

        tokens.remove().unwrap();
        assert!(tokens.get().unwrap().is_none());
    }

    #[test]
    fn test_expired_token_reads_as_absent() {
        let tokens = store();
        tokens
            .set(
                &SecretString::from("old"),
                Some(Utc::now() - chrono::Duration::seconds(1)),
            )
            .unwrap();
        assert!(tokens.get().unwrap().is_none());
    }

    #[test]
    fn test_unusable_lifetime_is_rejected_without_storing() {
        for ttl in [
            chrono::Duration::days(-1),
            chrono::Duration::zero(),
            chrono::Duration::MAX,
        ] {
            let tokens = TokenStore::new(Arc::new(MemoryStorage::new()), ttl);
            let err = tokens
                .set_with_default_expiry(&SecretString::from("jwt-value"))
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidExpiry(d) if d == ttl));
            assert!(!tokens.is_authenticated().unwrap());
        }
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let tokens = store();
        tokens
            .set(&SecretString::from("very-secret-jwt"), None)
            .unwrap();
        assert!(!format!("{tokens:?}").contains("very-secret-jwt"));
    }
}

//! The credential store.
//!
//! Owns the single bearer token of a session: an in-memory slot mirrored to a
//! durable [`CredentialStorage`] under a configured key. The slot only ever
//! holds a value that was successfully persisted, so a restart never loses a
//! token the process was already using, and never resurrects one it dropped.

use crate::providers::CredentialStorage;
use reqwest::header::{HeaderMap, HeaderName};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the session credential.
///
/// Cloning is cheap; all clones see the same slot. Reads never touch the
/// durable medium after construction.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn CredentialStorage>,
    token_key: String,
    header_key: HeaderName,
    cache: RwLock<Option<String>>,
}

impl CredentialStore {
    /// Open the store, reading the current token from `storage` once.
    ///
    /// An unreadable medium or an empty stored value both mean "no credential".
    pub fn load(
        storage: Arc<dyn CredentialStorage>,
        token_key: impl Into<String>,
        header_key: HeaderName,
    ) -> Self {
        let token_key = token_key.into();

        let initial = match storage.load(&token_key) {
            Ok(value) => value.filter(|token| !token.is_empty()),
            Err(error) => {
                tracing::warn!(key = %token_key, error = %error, "Failed to read stored credential");
                None
            },
        };
        tracing::debug!(key = %token_key, present = initial.is_some(), "Credential store opened");

        Self {
            inner: Arc::new(Inner {
                storage,
                token_key,
                header_key,
                cache: RwLock::new(initial),
            }),
        }
    }

    /// Current credential, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a credential is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Persist `token` and make it current.
    ///
    /// Returns whether the token was stored. A failed write is logged and
    /// leaves the current credential unchanged.
    pub fn set(&self, token: &str) -> bool {
        let mut cache = self.inner.cache.write().unwrap_or_else(PoisonError::into_inner);

        match self.inner.storage.save(&self.inner.token_key, token) {
            Ok(()) => {
                *cache = Some(token.to_string());
                true
            },
            Err(error) => {
                tracing::warn!(
                    key = %self.inner.token_key,
                    error = %error,
                    "Failed to persist credential; keeping the previous one"
                );
                metrics::counter!("auth.storage.write_failed").increment(1);
                false
            },
        }
    }

    /// Forget the credential, durably and in memory.
    ///
    /// The in-memory slot is cleared even when the durable delete fails.
    pub fn clear(&self) {
        let mut cache = self.inner.cache.write().unwrap_or_else(PoisonError::into_inner);

        if let Err(error) = self.inner.storage.remove(&self.inner.token_key) {
            tracing::warn!(key = %self.inner.token_key, error = %error, "Failed to delete stored credential");
        }
        *cache = None;
    }

    /// Adopt a rotated token announced in response headers.
    ///
    /// Does nothing unless the configured header carries a non-empty value.
    /// Returns whether a new token was stored.
    pub fn refresh_from_headers(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(&self.inner.header_key) else {
            return false;
        };

        let token = match value.to_str() {
            Ok(token) if !token.is_empty() => token,
            Ok(_) => return false,
            Err(_) => {
                tracing::warn!(header = %self.inner.header_key, "Ignoring non-ASCII refreshed credential");
                return false;
            },
        };

        let stored = self.set(token);
        if stored {
            tracing::debug!(header = %self.inner.header_key, "Credential refreshed from response");
            metrics::counter!("auth.token.refreshed").increment(1);
        }
        stored
    }

    /// Durable key the credential is stored under.
    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.inner.token_key
    }

    /// Response header inspected for refreshed credentials.
    #[must_use]
    pub fn header_key(&self) -> &HeaderName {
        &self.inner.header_key
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("token_key", &self.inner.token_key)
            .field("header_key", &self.inner.header_key)
            .field("present", &self.is_present())
            .finish_non_exhaustive()
    }
}

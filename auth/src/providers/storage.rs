//! Durable key-value storage trait.

use crate::error::Result;

/// Durable key-value medium for the credential.
///
/// Calls are synchronous: the medium is expected to be local (a file, a
/// browser-style storage area, an OS keychain).
///
/// # Implementation Notes
///
/// - `load` of a missing key is `Ok(None)`, not an error
/// - `remove` of a missing key is `Ok(())`
/// - A failed `save` must leave the previous value in place
pub trait CredentialStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the medium cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the medium refuses the write.
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the medium cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

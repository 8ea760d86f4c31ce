//! Error types for credential storage and interceptor configuration.
//!
//! Request failures are not errors of this crate: they travel back to the
//! application as actions built from a [`RequestError`](crate::transport::RequestError).

use thiserror::Error;

/// Result type alias for credential storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures of the durable medium behind a credential store.
///
/// The credential store never propagates these: they are logged and the
/// in-memory state is left consistent with what was actually persisted.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium refused the write (e.g. quota exceeded).
    #[error("Storage quota exceeded for key {key}")]
    QuotaExceeded {
        /// Key that could not be written
        key: String,
    },

    /// The medium is not available at all.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// I/O failure of a file-backed medium.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be parsed or written.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid interceptor configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A key that must name something was empty.
    #[error("{name} must not be empty")]
    EmptyKey {
        /// Name of the offending setting
        name: &'static str,
    },

    /// The header key is not a valid HTTP header name.
    #[error("Invalid header name {0:?}")]
    InvalidHeaderName(String),

    /// The base URL could not be parsed as an absolute URL.
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected value
        url: String,
        /// Parser message
        reason: String,
    },

    /// The unauthorized status code is not a valid HTTP status.
    #[error("Invalid unauthorized status {0:?}")]
    InvalidStatus(String),
}
